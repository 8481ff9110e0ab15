//! Prints the CRD manifests as a multi-document YAML stream.

use crds::{Assignment, Profile};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let docs = [
        serde_yaml::to_string(&Profile::crd())?,
        serde_yaml::to_string(&Assignment::crd())?,
    ];
    for doc in docs {
        println!("---");
        print!("{doc}");
    }
    Ok(())
}
