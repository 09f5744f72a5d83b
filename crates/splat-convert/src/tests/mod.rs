use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use glam::Vec3;

use crate::ply::{PlyEncoding, ScalarType};
use crate::sh::rgb_to_sh;


/// Writes small ply files. Raw values are derived from display values by property name,
/// so layouts can be shuffled freely.
pub(crate) struct PlyBuilder {
    properties: Vec<(&'static str, ScalarType)>,
    rows: Vec<Vec<f64>>,
}

const GAUSSIAN_LAYOUT: [&str; 27] = [
    "x", "y", "z", "nx", "ny", "nz", "f_dc_0", "f_dc_1", "f_dc_2", "f_rest_0", "f_rest_1",
    "f_rest_2", "f_rest_3", "f_rest_4", "f_rest_5", "f_rest_6", "f_rest_7", "f_rest_8",
    "opacity", "scale_0", "scale_1", "scale_2", "rot_0", "rot_1", "rot_2", "rot_3", "confidence",
];

fn logit(p: f32) -> f64 {
    let p = p as f64;
    (p / (1.0 - p)).ln()
}

fn quantize(value: f32, ty: ScalarType) -> f64 {
    let max = match ty {
        ScalarType::U8 => u8::MAX as f64,
        ScalarType::U16 => u16::MAX as f64,
        ScalarType::F32 | ScalarType::F64 => return value as f64,
        other => panic!("No color quantization for {other:?}"),
    };
    (value as f64 * max).round()
}

impl PlyBuilder {
    /// The layout written by most 3DGS trainers, plus one unknown property.
    pub(crate) fn gaussian() -> Self {
        Self::with_properties(&GAUSSIAN_LAYOUT.map(|name| (name, ScalarType::F32)))
    }

    pub(crate) fn with_properties(properties: &[(&'static str, ScalarType)]) -> Self {
        Self {
            properties: properties.to_vec(),
            rows: vec![],
        }
    }

    pub(crate) fn splat(mut self, position: Vec3, rgb: Vec3, opacity: f32, scale: f32) -> Self {
        let sh = rgb_to_sh(rgb);
        let row = self
            .properties
            .iter()
            .map(|&(name, ty)| match name {
                "x" => position.x as f64,
                "y" => position.y as f64,
                "z" => position.z as f64,
                "f_dc_0" => sh.x as f64,
                "f_dc_1" => sh.y as f64,
                "f_dc_2" => sh.z as f64,
                "red" | "r" => quantize(rgb.x, ty),
                "green" | "g" => quantize(rgb.y, ty),
                "blue" | "b" => quantize(rgb.z, ty),
                "opacity" => logit(opacity),
                "scale" | "scale_0" | "scale_1" | "scale_2" => (scale as f64).ln(),
                "rot_0" => 1.0,
                _ => 0.0,
            })
            .collect();
        self.rows.push(row);
        self
    }

    /// Append a row of raw values, in property order.
    pub(crate) fn row(mut self, values: &[f64]) -> Self {
        assert_eq!(
            values.len(),
            self.properties.len(),
            "Row doesn't match the layout"
        );
        self.rows.push(values.to_vec());
        self
    }

    pub(crate) fn header(&self, encoding: PlyEncoding) -> String {
        let mut header = format!(
            "ply\nformat {} 1.0\ncomment written by the test suite\nelement vertex {}\n",
            encoding.name(),
            self.rows.len()
        );
        for (name, ty) in &self.properties {
            header += &format!("property {} {name}\n", ty.name());
        }
        header += "end_header\n";
        header
    }

    pub(crate) fn build(&self, encoding: PlyEncoding) -> Vec<u8> {
        let mut out = self.header(encoding).into_bytes();
        match encoding {
            PlyEncoding::Ascii => {
                for row in &self.rows {
                    let line: Vec<_> = row
                        .iter()
                        .zip(&self.properties)
                        .map(|(&v, &(_, ty))| match ty {
                            ScalarType::F32 => (v as f32).to_string(),
                            ScalarType::F64 => v.to_string(),
                            _ => (v as i64).to_string(),
                        })
                        .collect();
                    out.extend_from_slice(line.join(" ").as_bytes());
                    out.push(b'\n');
                }
            }
            PlyEncoding::BinaryLittleEndian => self.write_rows::<LittleEndian>(&mut out),
            PlyEncoding::BinaryBigEndian => self.write_rows::<BigEndian>(&mut out),
        }
        out
    }

    fn write_rows<E: ByteOrder>(&self, out: &mut Vec<u8>) {
        for row in &self.rows {
            for (&v, &(_, ty)) in row.iter().zip(&self.properties) {
                write_scalar::<E>(out, ty, v);
            }
        }
    }
}

pub(crate) fn write_scalar<E: ByteOrder>(out: &mut Vec<u8>, ty: ScalarType, v: f64) {
    match ty {
        ScalarType::I8 => out.write_i8(v as i8),
        ScalarType::U8 => out.write_u8(v as u8),
        ScalarType::I16 => out.write_i16::<E>(v as i16),
        ScalarType::U16 => out.write_u16::<E>(v as u16),
        ScalarType::I32 => out.write_i32::<E>(v as i32),
        ScalarType::U32 => out.write_u32::<E>(v as u32),
        ScalarType::F32 => out.write_f32::<E>(v as f32),
        ScalarType::F64 => out.write_f64::<E>(v),
    }
    .expect("Writing to a Vec can't fail");
}
