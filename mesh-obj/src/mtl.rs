//! MTL parser for the material subset our scenes use.

use std::collections::HashMap;

use crate::error::ParseError;

/// One `newmtl` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub emissive: [f32; 3],
    pub transmission: [f32; 3],
    pub shininess: f32,
    pub optical_density: f32,
    pub dissolve: f32,
    pub transparency: f32,
    pub illum: u32,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub normal_map: Option<String>,
}

impl Material {
    fn new(name: String) -> Self {
        Self {
            name,
            ambient: [0.0; 3],
            diffuse: [0.8; 3],
            specular: [0.0; 3],
            emissive: [0.0; 3],
            transmission: [0.0; 3],
            shininess: 0.0,
            optical_density: 1.0,
            dissolve: 1.0,
            transparency: 0.0,
            illum: 0,
            diffuse_map: None,
            specular_map: None,
            normal_map: None,
        }
    }
}

fn parse_triple(value: &str, line: usize) -> Result<[f32; 3], ParseError> {
    let parts: Vec<f32> = value
        .split_whitespace()
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| ParseError::new(line, format!("bad number: '{t}'")))
        })
        .collect::<Result<_, _>>()?;
    if parts.len() < 3 {
        return Err(ParseError::new(
            line,
            format!("expected 3 components, found {}", parts.len()),
        ));
    }
    Ok([parts[0], parts[1], parts[2]])
}

fn parse_scalar(value: &str, line: usize) -> Result<f32, ParseError> {
    value
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new(line, "missing value"))?
        .parse::<f32>()
        .map_err(|_| ParseError::new(line, format!("bad number: '{value}'")))
}

/// Parse MTL text into materials keyed by name. Unknown keys fail the load.
pub fn parse_mtl(text: &str) -> Result<HashMap<String, Material>, ParseError> {
    let mut materials = HashMap::new();
    let mut current: Option<Material> = None;

    for (line_no, raw) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(split) = line.find(' ') else {
            continue;
        };
        let (key, value) = line.split_at(split);
        let value = value.trim();

        if key == "newmtl" {
            if let Some(done) = current.take() {
                materials.insert(done.name.clone(), done);
            }
            current = Some(Material::new(value.to_string()));
            continue;
        }

        let material = current
            .as_mut()
            .ok_or_else(|| ParseError::new(line_no, format!("'{key}' before newmtl")))?;
        match key {
            "Ka" => material.ambient = parse_triple(value, line_no)?,
            "Kd" => material.diffuse = parse_triple(value, line_no)?,
            "Ks" => material.specular = parse_triple(value, line_no)?,
            "Ke" => material.emissive = parse_triple(value, line_no)?,
            "Tf" => material.transmission = parse_triple(value, line_no)?,
            "Ns" => material.shininess = parse_scalar(value, line_no)?,
            "Ni" => material.optical_density = parse_scalar(value, line_no)?,
            "d" => material.dissolve = parse_scalar(value, line_no)?,
            "Tr" => material.transparency = parse_scalar(value, line_no)?,
            "illum" => material.illum = parse_scalar(value, line_no)? as u32,
            "map_Kd" => material.diffuse_map = Some(value.to_string()),
            "map_Ks" => material.specular_map = Some(value.to_string()),
            "map_norm" => material.normal_map = Some(value.to_string()),
            _ => {
                return Err(ParseError::new(
                    line_no,
                    format!("key not recognized: '{key}'"),
                ))
            }
        }
    }

    if let Some(done) = current.take() {
        materials.insert(done.name.clone(), done);
    }
    Ok(materials)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# living room materials
newmtl wood
Ka 0.2 0.2 0.2
Kd 0.6 0.4 0.2
Ks 0.1 0.1 0.1
Ns 32
d 1.0
illum 2
map_Kd wood_albedo.jpg
map_norm wood_normal.jpg

newmtl plaster
Kd 0.9 0.9 0.85
";

    #[test]
    fn parses_materials_with_maps_and_scalars() {
        let materials = parse_mtl(SAMPLE).unwrap();
        assert_eq!(materials.len(), 2);
        let wood = &materials["wood"];
        assert_eq!(wood.diffuse, [0.6, 0.4, 0.2]);
        assert_eq!(wood.shininess, 32.0);
        assert_eq!(wood.illum, 2);
        assert_eq!(wood.diffuse_map.as_deref(), Some("wood_albedo.jpg"));
        assert_eq!(wood.normal_map.as_deref(), Some("wood_normal.jpg"));
        assert!(materials["plaster"].diffuse_map.is_none());
    }

    #[test]
    fn unknown_key_fails() {
        let err = parse_mtl("newmtl m\nKq 1 2 3\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn property_before_newmtl_fails() {
        assert!(parse_mtl("Kd 1 0 0\n").is_err());
    }

    #[test]
    fn last_material_is_kept() {
        let materials = parse_mtl("newmtl only\nKd 0.1 0.2 0.3\n").unwrap();
        assert_eq!(materials["only"].diffuse, [0.1, 0.2, 0.3]);
    }
}
