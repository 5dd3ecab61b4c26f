// Asset identity and the type-id naming table used for on-disk layout.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Asset types with dedicated handling in the pipeline.
pub const TYPE_IMAGE: u32 = 1;
pub const TYPE_MESH: u32 = 4;
pub const TYPE_DECAL: u32 = 13;
pub const TYPE_MESH_PART: u32 = 40;
pub const TYPE_TEXTURE_PACK: u32 = 63;

/// Identity of an asset: `(asset_id, asset_type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetKey {
    pub asset_id: u64,
    pub asset_type: u32,
}

impl AssetKey {
    pub fn new(asset_id: u64, asset_type: u32) -> Self {
        Self {
            asset_id,
            asset_type,
        }
    }

    /// Key string used in the durable index document, e.g. `"4_12345"`.
    pub fn index_key(&self) -> String {
        format!("{}_{}", self.asset_type, self.asset_id)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", asset_type_name(self.asset_type), self.asset_id)
    }
}

/// Human-readable name for an asset type id. Unknown ids render as
/// `Unknown<N>` so they still get a stable per-type subdirectory.
pub fn asset_type_name(type_id: u32) -> String {
    let name = match type_id {
        1 => "Image",
        2 => "TShirt",
        3 => "Audio",
        4 => "Mesh",
        5 => "Lua",
        8 => "Hat",
        9 => "Place",
        10 => "Model",
        11 => "Shirt",
        12 => "Pants",
        13 => "Decal",
        17 => "Head",
        18 => "Face",
        19 => "Gear",
        24 => "Animation",
        32 => "Package",
        38 => "Plugin",
        39 => "SolidModel",
        40 => "MeshPart",
        41 => "HairAccessory",
        42 => "FaceAccessory",
        43 => "NeckAccessory",
        44 => "ShoulderAccessory",
        45 => "FrontAccessory",
        46 => "BackAccessory",
        47 => "WaistAccessory",
        48 => "ClimbAnimation",
        49 => "DeathAnimation",
        50 => "FallAnimation",
        51 => "IdleAnimation",
        52 => "JumpAnimation",
        53 => "RunAnimation",
        54 => "SwimAnimation",
        55 => "WalkAnimation",
        56 => "PoseAnimation",
        61 => "EmoteAnimation",
        62 => "Video",
        63 => "TexturePack",
        73 => "FontFamily",
        74 => "FontFace",
        78 => "MoodAnimation",
        79 => "DynamicHead",
        _ => return format!("Unknown{}", type_id),
    };
    name.to_string()
}

/// Whether captured content of this type may need a derived format.
/// Image/Decal payloads need a decoded PNG when they arrive as KTX
/// textures; texture packs need their manifest resolved.
pub fn needs_conversion(type_id: u32) -> bool {
    matches!(type_id, TYPE_IMAGE | TYPE_DECAL | TYPE_TEXTURE_PACK)
}
