//! Departments every body can hold elements for.

pub const GEO: &str = "geo";
pub const CAMERA: &str = "camera";
pub const ANIMATION: &str = "animation";
pub const RIG: &str = "rig";
pub const HDA: &str = "hda";
pub const TEXTURES: &str = "textures";
pub const MATERIALS: &str = "materials";
pub const LIGHTS: &str = "lights";
pub const HIP: &str = "hip";
pub const LAYOUT: &str = "layout";
pub const USD: &str = "usd";
pub const MAYA: &str = "maya";

pub const ALL: [&str; 12] = [
    GEO, CAMERA, ANIMATION, RIG, HDA, TEXTURES, MATERIALS, LIGHTS, HIP, LAYOUT, USD, MAYA,
];

/// Primary file extension stamped on a new element of `department`
pub fn default_app_ext(department: &str) -> Option<&'static str> {
    match department {
        GEO => Some(".obj"),
        ANIMATION | CAMERA => Some(".abc"),
        RIG => Some(".mb"),
        USD => Some(".usda"),
        _ => None,
    }
}
