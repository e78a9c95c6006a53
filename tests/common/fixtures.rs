//! Resource and catalog fixtures.
#![allow(dead_code)]

use std::path::PathBuf;

use serde_json::json;

use cloudcost::core::models::ResourceDescriptor;
use cloudcost::test_utils::TestDir;

/// A small multi-cloud fleet: two AWS resources, one Azure, one GCP.
#[must_use]
pub fn fleet() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new("web-1", "aws:ec2/instance:Instance", "aws")
            .with_property("instanceType", json!("t3.micro"))
            .with_property("tags", json!({"env": "prod", "team": "web"})),
        ResourceDescriptor::new("logs", "aws:s3/bucket:Bucket", "aws")
            .with_property("tags", json!({"env": "dev"})),
        ResourceDescriptor::new("db-1", "azure:sql:Database", "azure")
            .with_property("tags", json!({"env": "prod"})),
        ResourceDescriptor::new("vm-9", "gcp:compute/instance:Instance", "gcp"),
    ]
}

/// Write resources as a JSON array and return the file path.
pub fn write_resources(dir: &TestDir, resources: &[ResourceDescriptor]) -> PathBuf {
    let content = serde_json::to_string_pretty(resources).expect("serialize resources");
    dir.create_file("resources.json", &content)
}

/// Catalog pricing EC2 instances and S3 buckets.
pub const CATALOG_JSON: &str = r#"{
    "aws:ec2/instance:Instance": {"monthly": 7.59, "hourly": 0.0104, "currency": "USD"},
    "aws:s3/bucket:Bucket": {"monthly": 2.30, "hourly": 0.0032, "currency": "USD", "notes": "standard tier"}
}"#;

/// Write [`CATALOG_JSON`] and return the file path.
pub fn write_catalog(dir: &TestDir) -> PathBuf {
    dir.create_file("catalog.json", CATALOG_JSON)
}
