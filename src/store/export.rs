// Export of cached assets to a caller-chosen destination.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::asset::{asset_type_name, AssetKey};
use crate::error::{Error, Result};
use crate::mesh::decoder::MeshDecoder;
use crate::mesh::obj;
use crate::store::cache_store::CacheStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Decompressed original bytes.
    Raw,
    /// Wavefront OBJ, produced by the mesh decoder. Mesh assets only.
    Obj,
}

/// Per-item export result. One unreadable file never aborts the batch.
#[derive(Debug)]
pub struct ExportOutcome {
    pub key: AssetKey,
    pub result: Result<PathBuf>,
}

impl CacheStore {
    /// Copy (or convert) the selected assets into `dest`. Returns one
    /// outcome per requested key, in selection order.
    pub fn export(
        &self,
        decoder: &MeshDecoder,
        selection: &[AssetKey],
        dest: &Path,
        format: ExportFormat,
    ) -> Vec<ExportOutcome> {
        let mut outcomes = Vec::with_capacity(selection.len());
        for key in selection {
            let result = self.export_one(decoder, key, dest, format);
            if let Err(e) = &result {
                warn!("export {} failed: {}", key, e);
            }
            outcomes.push(ExportOutcome { key: *key, result });
        }
        let exported = outcomes.iter().filter(|o| o.result.is_ok()).count();
        info!("exported {}/{} asset(s) to {}", exported, selection.len(), dest.display());
        outcomes
    }

    fn export_one(
        &self,
        decoder: &MeshDecoder,
        key: &AssetKey,
        dest: &Path,
        format: ExportFormat,
    ) -> Result<PathBuf> {
        let data = self.get(key)?;
        // Per-type subdirectories, so one id under two types never
        // overwrites itself.
        let type_dir = dest.join(asset_type_name(key.asset_type));
        fs::create_dir_all(&type_dir)?;

        match format {
            ExportFormat::Raw => {
                let path = type_dir.join(format!("{}.bin", key.asset_id));
                fs::write(&path, &data)?;
                Ok(path)
            }
            ExportFormat::Obj => {
                if !crate::mesh::is_mesh_payload(&data) {
                    return Err(Error::MalformedAsset(format!(
                        "{} is not a mesh payload",
                        key
                    )));
                }
                let mesh = decoder.decode(&data)?;
                let path = type_dir.join(format!("{}.obj", key.asset_id));
                fs::write(&path, obj::to_obj_string(&mesh))?;
                Ok(path)
            }
        }
    }
}
