//! gcloud component identifiers.

use std::fmt;
use std::str::FromStr;

/// A `gcloud` component. The id string is all gcloud ever sees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SdkComponent {
    AppEngineJava,
    AppEnginePython,
    AppEngineGo,
    Alpha,
    Beta,
    Bq,
    Core,
    Gsutil,
    Kubectl,
    CloudDatastoreEmulator,
    CloudFirestoreEmulator,
    PubsubEmulator,
    Cbt,
    Bigtable,
    DockerCredentialGcr,
    Other(String),
}

impl SdkComponent {
    pub fn id(&self) -> &str {
        match self {
            SdkComponent::AppEngineJava => "app-engine-java",
            SdkComponent::AppEnginePython => "app-engine-python",
            SdkComponent::AppEngineGo => "app-engine-go",
            SdkComponent::Alpha => "alpha",
            SdkComponent::Beta => "beta",
            SdkComponent::Bq => "bq",
            SdkComponent::Core => "core",
            SdkComponent::Gsutil => "gsutil",
            SdkComponent::Kubectl => "kubectl",
            SdkComponent::CloudDatastoreEmulator => "cloud-datastore-emulator",
            SdkComponent::CloudFirestoreEmulator => "cloud-firestore-emulator",
            SdkComponent::PubsubEmulator => "pubsub-emulator",
            SdkComponent::Cbt => "cbt",
            SdkComponent::Bigtable => "bigtable",
            SdkComponent::DockerCredentialGcr => "docker-credential-gcr",
            SdkComponent::Other(id) => id,
        }
    }
}

impl FromStr for SdkComponent {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let component = match s.trim() {
            "app-engine-java" => SdkComponent::AppEngineJava,
            "app-engine-python" => SdkComponent::AppEnginePython,
            "app-engine-go" => SdkComponent::AppEngineGo,
            "alpha" => SdkComponent::Alpha,
            "beta" => SdkComponent::Beta,
            "bq" => SdkComponent::Bq,
            "core" => SdkComponent::Core,
            "gsutil" => SdkComponent::Gsutil,
            "kubectl" => SdkComponent::Kubectl,
            "cloud-datastore-emulator" => SdkComponent::CloudDatastoreEmulator,
            "cloud-firestore-emulator" => SdkComponent::CloudFirestoreEmulator,
            "pubsub-emulator" => SdkComponent::PubsubEmulator,
            "cbt" => SdkComponent::Cbt,
            "bigtable" => SdkComponent::Bigtable,
            "docker-credential-gcr" => SdkComponent::DockerCredentialGcr,
            other => SdkComponent::Other(other.to_string()),
        };
        Ok(component)
    }
}

impl fmt::Display for SdkComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
