use sha2::{Digest, Sha256};

use crate::types::HardwareProfile;

/// Hex SHA-256 over the fields kernel selection and blocking depend on.
/// Diagnostics and the GPU driver string are left out so two probes of the
/// same machine agree.
pub fn fingerprint(p: &HardwareProfile) -> String {
    let mut hasher = Sha256::new();

    for field in [&p.os, &p.arch, &p.cpu_brand] {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    for name in p.cpu_features.names() {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(p.cpu_cores.physical.to_le_bytes());
    hasher.update(p.cpu_cores.logical.to_le_bytes());

    let c = &p.cache;
    for kb in [c.l1_data_kb, c.l1_instruction_kb, c.l2_kb, c.l3_kb, c.line_bytes] {
        hasher.update(kb.unwrap_or(0).to_le_bytes());
    }
    hasher.update(p.memory.total_ram_mb.to_le_bytes());

    hasher.update([p.gpu.present as u8]);
    if p.gpu.present {
        hasher.update(p.gpu.name.as_bytes());
        hasher.update([0u8]);
        if let Some(cc) = p.gpu.compute_capability {
            hasher.update(cc.major.to_le_bytes());
            hasher.update(cc.minor.to_le_bytes());
        }
        if let Some(mb) = p.gpu.memory_mb {
            hasher.update(mb.to_le_bytes());
        }
    }

    hex::encode(hasher.finalize())
}

impl HardwareProfile {
    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }
}
