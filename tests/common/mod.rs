//! Shared inventory fixture for integration tests.

use inventory_sync::config::{default_config, SyncConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DOMAIN: &str = "cluster.example.edu";

/// Vendor export with a metadata preamble and the primary column names.
pub const PRIMARY_EXPORT: &str = "\
Report generated 2024-03-01
Account,Research Computing

Svc Tag,Model,Hardware/Primary End Date
a1,R650,2024-01-01
,R650,2024-05-05
";

/// Second export using the alternate column names; its A1 date loses.
pub const SECONDARY_EXPORT: &str = "\
Tag,Existing End Date,Notes
B2,2024-02-02,spare
A1,2030-12-31,renewal quote
";

pub const NODE07: &str = "\
---
# node07 host vars
dell_service_tag: a1
public_mac: 'aa:bb:cc:dd:ee:ff'
public_ip: 10.1.0.7
slurm_partitions:
- compute
- gpu
";

pub const NODE07_SYNCED: &str = "\
---
# node07 host vars
dell_service_tag: a1
dell_eos: 2024-01-01
public_mac: 'aa:bb:cc:dd:ee:ff'
idrac_ip: 10.0.0.5
public_ip: 10.1.0.7
slurm_partitions:
  - compute
  - gpu
";

pub const NODE08: &str = "---\nhostname: node08\ndell_service_tag: c3\n";

pub const NODE09_BROKEN: &str = "---\ndell_service_tag: [a1\npublic_ip: 10.1.0.9\n";

/// Temp directory laid out like an inventory checkout.
pub struct SyncFixture {
    pub dir: TempDir,
}

impl SyncFixture {
    pub fn seeded() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let fixture = Self { dir };
        fixture.write("exports/primary.csv", PRIMARY_EXPORT);
        fixture.write("exports/secondary.csv", SECONDARY_EXPORT);
        fixture.write(&document_name("node07"), NODE07);
        fixture.write(&document_name("node08"), NODE08);
        fixture.write(&document_name("node09"), NODE09_BROKEN);
        fixture.write("host_vars/README.md", "not a document\n");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(&self, relative: &str, text: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(&path, text).expect("write fixture file");
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("read fixture file")
    }

    /// Config whose relative paths point into this fixture.
    pub fn config(&self) -> SyncConfig {
        let mut config = default_config(DOMAIN);
        config.inventory_dir = PathBuf::from("host_vars");
        config.exports = vec![
            PathBuf::from("exports/primary.csv"),
            PathBuf::from("exports/missing.csv"),
            PathBuf::from("exports/secondary.csv"),
        ];
        config
    }
}

pub fn document_name(node: &str) -> String {
    format!("host_vars/{node}.{DOMAIN}.yml")
}
