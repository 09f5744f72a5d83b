use std::collections::HashMap;
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use glam::Vec3;

use crate::error::ConversionError;
use crate::sh::sh_to_rgb;
use crate::splat::{Scene, SplatRecord};

const VERTEX_ELEMENT: &str = "vertex";
const SH_DC_NAMES: [&str; 3] = ["f_dc_0", "f_dc_1", "f_dc_2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyEncoding {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl PlyEncoding {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ascii" => Some(Self::Ascii),
            "binary_little_endian" => Some(Self::BinaryLittleEndian),
            "binary_big_endian" => Some(Self::BinaryBigEndian),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::BinaryLittleEndian => "binary_little_endian",
            Self::BinaryBigEndian => "binary_big_endian",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "char" | "int8" => Some(Self::I8),
            "uchar" | "uint8" => Some(Self::U8),
            "short" | "int16" => Some(Self::I16),
            "ushort" | "uint16" => Some(Self::U16),
            "int" | "int32" => Some(Self::I32),
            "uint" | "uint32" => Some(Self::U32),
            "float" | "float32" => Some(Self::F32),
            "double" | "float64" => Some(Self::F64),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "char",
            Self::U8 => "uchar",
            Self::I16 => "short",
            Self::U16 => "ushort",
            Self::I32 => "int",
            Self::U32 => "uint",
            Self::F32 => "float",
            Self::F64 => "double",
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Full scale of integer types. Quantized color channels are divided by this.
    fn integer_max(self) -> Option<f64> {
        match self {
            Self::I8 => Some(i8::MAX as f64),
            Self::U8 => Some(u8::MAX as f64),
            Self::I16 => Some(i16::MAX as f64),
            Self::U16 => Some(u16::MAX as f64),
            Self::I32 => Some(i32::MAX as f64),
            Self::U32 => Some(u32::MAX as f64),
            Self::F32 | Self::F64 => None,
        }
    }

    fn decode<E: ByteOrder>(self, bytes: &[u8]) -> f64 {
        match self {
            Self::I8 => bytes[0] as i8 as f64,
            Self::U8 => bytes[0] as f64,
            Self::I16 => E::read_i16(bytes) as f64,
            Self::U16 => E::read_u16(bytes) as f64,
            Self::I32 => E::read_i32(bytes) as f64,
            Self::U32 => E::read_u32(bytes) as f64,
            Self::F32 => E::read_f32(bytes) as f64,
            Self::F64 => E::read_f64(bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDef {
    pub name: String,
    pub count: usize,
    pub properties: Vec<PropertyDef>,
}

impl ElementDef {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name == name)
    }

    /// Size of one row in bytes, if no property is a list.
    fn fixed_stride(&self) -> Option<usize> {
        self.properties
            .iter()
            .map(|p| match p.kind {
                PropertyKind::Scalar(ty) => Some(ty.size()),
                PropertyKind::List { .. } => None,
            })
            .sum()
    }

    fn truncated(&self, found: usize) -> ConversionError {
        ConversionError::TruncatedPayload {
            element: self.name.clone(),
            expected: self.count,
            found,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyHeader {
    pub encoding: PlyEncoding,
    pub comments: Vec<String>,
    pub elements: Vec<ElementDef>,
}

fn malformed(reason: impl Into<String>) -> ConversionError {
    ConversionError::MalformedHeader(reason.into())
}

/// Splits off lines one by one, tracking how many bytes have been consumed.
struct HeaderLines<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for HeaderLines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.bytes[self.pos..];
        if rest.is_empty() {
            return None;
        }
        let line = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                self.pos += end + 1;
                &rest[..end]
            }
            None => {
                self.pos = self.bytes.len();
                rest
            }
        };
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}

fn parse_type(name: Option<&str>) -> Result<ScalarType, ConversionError> {
    let name = name.ok_or_else(|| malformed("property line is missing a type"))?;
    ScalarType::from_name(name).ok_or_else(|| malformed(format!("unknown property type `{name}`")))
}

impl PlyHeader {
    /// Parse the textual header. Returns the header and the offset of the first payload byte.
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), ConversionError> {
        let mut lines = HeaderLines { bytes, pos: 0 };

        if lines.next().map(<[u8]>::trim_ascii) != Some(b"ply".as_slice()) {
            return Err(malformed("missing `ply` magic"));
        }

        let mut encoding = None;
        let mut comments = vec![];
        let mut elements: Vec<ElementDef> = vec![];

        loop {
            let raw = lines
                .next()
                .ok_or_else(|| malformed("missing `end_header`"))?;
            let line =
                std::str::from_utf8(raw).map_err(|_e| malformed("header is not valid ASCII"))?;
            let mut tokens = line.split_ascii_whitespace();

            match tokens.next() {
                None => {}
                Some("end_header") => break,
                Some("comment" | "obj_info") => {
                    let text = line
                        .trim_start()
                        .split_once(char::is_whitespace)
                        .map(|(_, text)| text.trim().to_owned())
                        .unwrap_or_default();
                    comments.push(text);
                }
                Some("format") => {
                    let name = tokens
                        .next()
                        .ok_or_else(|| malformed("format line is missing an encoding"))?;
                    let version = tokens.next();
                    encoding = Some(PlyEncoding::from_name(name).ok_or_else(|| {
                        ConversionError::UnsupportedFormat(format!("encoding `{name}`"))
                    })?);
                    if version != Some("1.0") {
                        return Err(ConversionError::UnsupportedFormat(format!(
                            "version `{}`",
                            version.unwrap_or_default()
                        )));
                    }
                }
                Some("element") => {
                    let (Some(name), Some(count)) = (tokens.next(), tokens.next()) else {
                        return Err(malformed(format!("incomplete element line `{line}`")));
                    };
                    let count = count
                        .parse()
                        .map_err(|_e| malformed(format!("invalid element count `{count}`")))?;
                    elements.push(ElementDef {
                        name: name.to_owned(),
                        count,
                        properties: vec![],
                    });
                }
                Some("property") => {
                    let element = elements
                        .last_mut()
                        .ok_or_else(|| malformed("property declared before any element"))?;
                    let type_name = tokens.next();
                    let kind = if type_name == Some("list") {
                        let count = parse_type(tokens.next())?;
                        let item = parse_type(tokens.next())?;
                        PropertyKind::List { count, item }
                    } else {
                        PropertyKind::Scalar(parse_type(type_name)?)
                    };
                    let name = tokens
                        .next()
                        .ok_or_else(|| malformed(format!("property without a name `{line}`")))?;
                    element.properties.push(PropertyDef {
                        name: name.to_owned(),
                        kind,
                    });
                }
                Some(other) => return Err(malformed(format!("unexpected keyword `{other}`"))),
            }
        }

        let encoding = encoding.ok_or_else(|| malformed("missing format line"))?;

        Ok((
            Self {
                encoding,
                comments,
                elements,
            },
            lines.pos,
        ))
    }

    pub fn element(&self, name: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: usize,
    column: usize,
    ty: ScalarType,
}

/// Name to location lookup for a fixed layout element, built once per file.
struct PropertyTable {
    stride: usize,
    columns: usize,
    slots: HashMap<String, Slot>,
}

impl PropertyTable {
    fn build(element: &ElementDef) -> Result<Self, ConversionError> {
        let mut slots = HashMap::with_capacity(element.properties.len());
        let mut offset = 0;

        for (column, prop) in element.properties.iter().enumerate() {
            let PropertyKind::Scalar(ty) = prop.kind else {
                return Err(ConversionError::UnsupportedFormat(format!(
                    "list property `{}` in `{}` element",
                    prop.name, element.name
                )));
            };
            if slots
                .insert(prop.name.clone(), Slot { offset, column, ty })
                .is_some()
            {
                return Err(malformed(format!("duplicate property `{}`", prop.name)));
            }
            offset += ty.size();
        }

        Ok(Self {
            stride: offset,
            columns: element.properties.len(),
            slots,
        })
    }

    fn get(&self, name: &'static str) -> Option<NamedSlot> {
        self.slots.get(name).map(|&slot| NamedSlot { name, slot })
    }

    fn require(&self, name: &'static str) -> Result<NamedSlot, ConversionError> {
        self.get(name)
            .ok_or_else(|| ConversionError::MissingProperty(name.to_owned()))
    }
}

#[derive(Debug, Clone, Copy)]
struct NamedSlot {
    name: &'static str,
    slot: Slot,
}

/// Access to the raw values of one row.
trait RowSource {
    fn value(&self, slot: Slot) -> f64;
}

struct BinaryRow<'a, E> {
    bytes: &'a [u8],
    _order: PhantomData<E>,
}

impl<E: ByteOrder> RowSource for BinaryRow<'_, E> {
    fn value(&self, slot: Slot) -> f64 {
        slot.ty.decode::<E>(&self.bytes[slot.offset..slot.offset + slot.ty.size()])
    }
}

struct AsciiRow<'a> {
    tokens: Vec<&'a str>,
}

impl RowSource for AsciiRow<'_> {
    fn value(&self, slot: Slot) -> f64 {
        // Unparsable tokens surface as an invalid value for the property that needed them.
        self.tokens
            .get(slot.column)
            .and_then(|t| t.parse().ok())
            .unwrap_or(f64::NAN)
    }
}

enum ScaleLayout {
    Anisotropic([NamedSlot; 3]),
    Isotropic(NamedSlot),
}

enum ColorLayout {
    ShDc([NamedSlot; 3]),
    Rgb([NamedSlot; 3]),
}

/// The required properties of a splat, resolved before any payload is read.
struct SplatLayout {
    position: [NamedSlot; 3],
    opacity: NamedSlot,
    scale: ScaleLayout,
    color: ColorLayout,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl SplatLayout {
    fn resolve(table: &PropertyTable) -> Result<Self, ConversionError> {
        let position = [table.require("x")?, table.require("y")?, table.require("z")?];
        let opacity = table.require("opacity")?;

        let scale = match table.get("scale_0") {
            Some(scale_0) if table.get("scale_1").is_none() && table.get("scale_2").is_none() => {
                ScaleLayout::Isotropic(scale_0)
            }
            Some(scale_0) => ScaleLayout::Anisotropic([
                scale_0,
                table.require("scale_1")?,
                table.require("scale_2")?,
            ]),
            None => ScaleLayout::Isotropic(
                table
                    .get("scale")
                    .ok_or_else(|| ConversionError::MissingProperty("scale_0".to_owned()))?,
            ),
        };

        let color = match SH_DC_NAMES.map(|name| table.get(name)) {
            [Some(r), Some(g), Some(b)] => ColorLayout::ShDc([r, g, b]),
            [None, None, None] => {
                let channel = |name, alias| table.get(name).or_else(|| table.get(alias));
                match (
                    channel("red", "r"),
                    channel("green", "g"),
                    channel("blue", "b"),
                ) {
                    (Some(r), Some(g), Some(b)) => ColorLayout::Rgb([r, g, b]),
                    _ => return Err(ConversionError::MissingProperty(SH_DC_NAMES[0].to_owned())),
                }
            }
            partial => {
                let missing = SH_DC_NAMES
                    .iter()
                    .zip(partial)
                    .find_map(|(name, slot)| slot.is_none().then_some(*name))
                    .unwrap_or(SH_DC_NAMES[0]);
                return Err(ConversionError::MissingProperty(missing.to_owned()));
            }
        };

        Ok(Self {
            position,
            opacity,
            scale,
            color,
        })
    }

    fn decode(&self, row: &impl RowSource, record: usize) -> Result<SplatRecord, ConversionError> {
        let invalid = |name: &str| ConversionError::InvalidNumericValue {
            property: name.to_owned(),
            record,
        };
        let read = |named: NamedSlot| {
            let value = row.value(named.slot);
            if value.is_finite() && (value as f32).is_finite() {
                Ok(value)
            } else {
                Err(invalid(named.name))
            }
        };

        let [x, y, z] = self.position;
        let position = glam::dvec3(read(x)?, read(y)?, read(z)?).as_vec3();

        let opacity = sigmoid(read(self.opacity)?) as f32;

        let (scale, scale_name) = match self.scale {
            ScaleLayout::Anisotropic(axes) => {
                let mut sum = 0.0;
                for axis in axes {
                    sum += read(axis)?.exp();
                }
                (sum / 3.0, axes[0].name)
            }
            ScaleLayout::Isotropic(radius) => (read(radius)?.exp(), radius.name),
        };
        let scale = scale as f32;
        if !scale.is_finite() {
            return Err(invalid(scale_name));
        }

        let color = match self.color {
            ColorLayout::ShDc([r, g, b]) => {
                sh_to_rgb(Vec3::new(read(r)? as f32, read(g)? as f32, read(b)? as f32))
            }
            ColorLayout::Rgb(channels) => {
                let mut rgb = [0.0; 3];
                for (out, channel) in rgb.iter_mut().zip(channels) {
                    let value = read(channel)?;
                    let value = channel.slot.ty.integer_max().map_or(value, |max| value / max);
                    *out = (value as f32).clamp(0.0, 1.0);
                }
                rgb
            }
        };

        Ok(SplatRecord {
            position,
            color,
            opacity,
            scale: scale.max(f32::MIN_POSITIVE),
        })
    }
}

/// Advance past the rows of an element we don't care about.
fn skip_binary_element<E: ByteOrder>(
    element: &ElementDef,
    payload: &[u8],
    start: usize,
) -> Result<usize, ConversionError> {
    let remaining = payload.len() - start;

    if let Some(stride) = element.fixed_stride() {
        let len = stride.saturating_mul(element.count);
        if len > remaining {
            return Err(element.truncated(remaining / stride.max(1)));
        }
        return Ok(start + len);
    }

    let mut pos = start;
    for row in 0..element.count {
        for prop in &element.properties {
            let size = match prop.kind {
                PropertyKind::Scalar(ty) => ty.size(),
                PropertyKind::List { count, item } => {
                    let count_bytes = payload
                        .get(pos..pos + count.size())
                        .ok_or_else(|| element.truncated(row))?;
                    let len = count.decode::<E>(count_bytes);
                    if len < 0.0 {
                        return Err(ConversionError::InvalidNumericValue {
                            property: prop.name.clone(),
                            record: row,
                        });
                    }
                    count.size() + (len as usize).saturating_mul(item.size())
                }
            };
            pos = pos.saturating_add(size);
            if pos > payload.len() {
                return Err(element.truncated(row));
            }
        }
    }
    Ok(pos)
}

fn decode_binary<E: ByteOrder>(
    header: &PlyHeader,
    vertex_index: usize,
    table: &PropertyTable,
    layout: &SplatLayout,
    payload: &[u8],
) -> Result<Vec<SplatRecord>, ConversionError> {
    let mut start = 0;
    for element in &header.elements[..vertex_index] {
        start = skip_binary_element::<E>(element, payload, start)?;
    }

    let vertex = &header.elements[vertex_index];
    let available = (payload.len() - start) / table.stride.max(1);
    if available < vertex.count {
        return Err(vertex.truncated(available));
    }

    let rows = payload[start..].chunks_exact(table.stride.max(1));
    let mut records = Vec::with_capacity(vertex.count);
    for (index, bytes) in rows.take(vertex.count).enumerate() {
        let row = BinaryRow::<E> {
            bytes,
            _order: PhantomData,
        };
        records.push(layout.decode(&row, index)?);
    }
    Ok(records)
}

fn decode_ascii(
    header: &PlyHeader,
    vertex_index: usize,
    table: &PropertyTable,
    layout: &SplatLayout,
    payload: &[u8],
) -> Result<Vec<SplatRecord>, ConversionError> {
    // Every row of every element sits on its own line.
    let mut lines = payload
        .split(|&b| b == b'\n')
        .map(String::from_utf8_lossy)
        .filter(|line| !line.trim().is_empty());

    for element in &header.elements[..vertex_index] {
        for row in 0..element.count {
            if lines.next().is_none() {
                return Err(element.truncated(row));
            }
        }
    }

    let vertex = &header.elements[vertex_index];
    // The declared count is untrusted, every row takes at least two bytes.
    let mut records = Vec::with_capacity(vertex.count.min(payload.len() / 2));
    for index in 0..vertex.count {
        let line = lines.next().ok_or_else(|| vertex.truncated(index))?;
        let row = AsciiRow {
            tokens: line.split_ascii_whitespace().collect(),
        };
        if row.tokens.len() < table.columns {
            return Err(vertex.truncated(index));
        }
        records.push(layout.decode(&row, index)?);
    }
    Ok(records)
}

/// Parse a gaussian splat ply file.
///
/// Only the `vertex` element is decoded. Properties are looked up by name, so extra or
/// reordered properties are fine, and higher order SH coefficients are skipped.
pub fn parse_ply(bytes: &[u8]) -> Result<Scene, ConversionError> {
    let (header, payload_start) = PlyHeader::parse(bytes)?;

    let vertex_index = header
        .elements
        .iter()
        .position(|e| e.name == VERTEX_ELEMENT)
        .ok_or_else(|| malformed("no `vertex` element"))?;
    let vertex = &header.elements[vertex_index];

    let table = PropertyTable::build(vertex)?;
    let layout = SplatLayout::resolve(&table)?;

    log::debug!(
        "Reading {} splats ({}, {} properties, {} byte rows)",
        vertex.count,
        header.encoding.name(),
        table.columns,
        table.stride
    );

    let payload = &bytes[payload_start..];
    let records = match header.encoding {
        PlyEncoding::Ascii => decode_ascii(&header, vertex_index, &table, &layout, payload)?,
        PlyEncoding::BinaryLittleEndian => {
            decode_binary::<LittleEndian>(&header, vertex_index, &table, &layout, payload)?
        }
        PlyEncoding::BinaryBigEndian => {
            decode_binary::<BigEndian>(&header, vertex_index, &table, &layout, payload)?
        }
    };

    Ok(Scene::new(records))
}
