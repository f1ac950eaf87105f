//! Binary terrain file: heights plus precomputed LOD meshes
//!
//! Layout (all numbers big-endian, strings are `u16` byte length + UTF-8):
//!
//! ```text
//! string   version            "1.1" or "1.2"
//! repeat until end of file:
//!   string tag                "HEIGHTMAP" | "LOD" | ...
//!   i32    byte_length        1.2 only
//!   payload
//!
//! HEIGHTMAP: i32 count, f32[count]
//! LOD:       i32 level_count (base level excluded)
//!            per level: i32 mesh_count
//!              per mesh: i32 float_count, f32[float_count], i32 index_count, u16[index_count]
//! ```
//!
//! Files without a version string are legacy: the whole file is one `f32`
//! height array. 1.1 sections carry no length, so an unknown tag ends the
//! read. 1.2 sections are skipped by length when the tag is unknown.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{Error, Result};
use crate::lod::LodMeshData;

const TAG_HEIGHTMAP: &str = "HEIGHTMAP";
const TAG_LOD: &str = "LOD";

/// Longest string accepted as a version header during sniffing
const MAX_VERSION_LEN: usize = 16;

/// On-disk format revision
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FormatVersion {
    /// Bare height array, no header, no LODs
    Legacy,
    /// Tagged sections without lengths
    #[default]
    V1_1,
    /// Tagged sections with `i32` byte lengths, skippable by older readers
    V1_2,
}

impl FormatVersion {
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            FormatVersion::Legacy => None,
            FormatVersion::V1_1 => Some("1.1"),
            FormatVersion::V1_2 => Some("1.2"),
        }
    }

    /// Map a header string to a format. Anything newer than 1.1 is read
    /// with length-prefixed sections.
    fn from_header(header: &str) -> FormatVersion {
        let mut parts = header.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        if (major, minor) <= (1, 1) {
            FormatVersion::V1_1
        } else {
            FormatVersion::V1_2
        }
    }
}

/// Decoded contents of a terrain file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainFileData {
    /// Row-major heights; resolution is `sqrt(heights.len())`
    pub heights: Vec<f32>,
    /// LOD levels 1.. (the base level is rebuilt from the heights)
    pub lods: Vec<Vec<LodMeshData>>,
    /// Format the data was read from
    pub version: FormatVersion,
}

impl TerrainFileData {
    pub fn new(heights: Vec<f32>, lods: Vec<Vec<LodMeshData>>) -> Self {
        Self {
            heights,
            lods,
            version: FormatVersion::default(),
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.version == FormatVersion::Legacy
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialize terrain data in the requested format.
///
/// Legacy output drops LOD data.
pub fn encode(data: &TerrainFileData, version: FormatVersion) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(16 + data.heights.len() * 4);

    let Some(header) = version.as_str() else {
        if !data.lods.is_empty() {
            log::warn!("Legacy terrain format cannot store LODs, dropping {} level(s)", data.lods.len());
        }
        write_f32s(&mut out, &data.heights);
        return Ok(out);
    };

    write_string(&mut out, header)?;

    let mut payload = Vec::with_capacity(4 + data.heights.len() * 4);
    write_len(&mut payload, data.heights.len())?;
    write_f32s(&mut payload, &data.heights);
    write_section(&mut out, version, TAG_HEIGHTMAP, &payload)?;

    if !data.lods.is_empty() {
        payload.clear();
        write_lods(&mut payload, &data.lods)?;
        write_section(&mut out, version, TAG_LOD, &payload)?;
    }

    Ok(out)
}

fn write_section(out: &mut Vec<u8>, version: FormatVersion, tag: &str, payload: &[u8]) -> Result<()> {
    write_string(out, tag)?;
    if version == FormatVersion::V1_2 {
        write_len(out, payload.len())?;
    }
    out.extend_from_slice(payload);
    Ok(())
}

fn write_lods(out: &mut Vec<u8>, lods: &[Vec<LodMeshData>]) -> Result<()> {
    write_len(out, lods.len())?;
    for level in lods {
        write_len(out, level.len())?;
        for mesh in level {
            write_len(out, mesh.vertices.len())?;
            write_f32s(out, &mesh.vertices);
            write_len(out, mesh.indices.len())?;
            for &i in &mesh.indices {
                out.extend_from_slice(&i.to_be_bytes());
            }
        }
    }
    Ok(())
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    let len = u16::try_from(s.len()).map_err(|_| Error::format(format!("string of {} bytes is too long", s.len())))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = i32::try_from(len).map_err(|_| Error::format(format!("count {} does not fit in i32", len)))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_be_bytes());
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Bounds-checked big-endian reader over a byte slice
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::format(format!(
                "unexpected end of data at byte {}: need {} more, have {}",
                self.pos,
                n,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Element count followed by `count * elem_size` bytes
    fn read_count(&mut self, elem_size: usize) -> Result<usize> {
        let at = self.pos;
        let count = self.read_i32()?;
        let count = usize::try_from(count).map_err(|_| Error::format(format!("negative count {} at byte {}", count, at)))?;
        if count.saturating_mul(elem_size) > self.remaining() {
            return Err(Error::format(format!(
                "count {} at byte {} exceeds remaining {} bytes",
                count,
                at,
                self.remaining()
            )));
        }
        Ok(count)
    }

    fn read_string(&mut self) -> Result<&'a str> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|e| Error::format(format!("invalid UTF-8 string: {}", e)))
    }

    fn read_f32s(&mut self, count: usize) -> Result<Vec<f32>> {
        let bytes = self.take(count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn read_u16s(&mut self, count: usize) -> Result<Vec<u16>> {
        let bytes = self.take(count * 2)?;
        Ok(bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect())
    }
}

/// Look for a `<digits>.<digits>` version header at the start of `bytes`
fn sniff_version(bytes: &[u8]) -> Option<&str> {
    let len = u16::from_be_bytes([*bytes.first()?, *bytes.get(1)?]) as usize;
    if len == 0 || len > MAX_VERSION_LEN {
        return None;
    }
    let header = std::str::from_utf8(bytes.get(2..2 + len)?).ok()?;
    let (major, minor) = header.split_once('.')?;
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    (is_number(major) && is_number(minor)).then_some(header)
}

/// Parse a terrain file
pub fn decode(bytes: &[u8]) -> Result<TerrainFileData> {
    let Some(header) = sniff_version(bytes) else {
        return decode_legacy(bytes);
    };

    let version = FormatVersion::from_header(header);
    let mut reader = Reader::new(bytes);
    reader.read_string()?;

    let mut heights = None;
    let mut lods = Vec::new();

    while !reader.is_empty() {
        let tag = reader.read_string()?;
        match version {
            FormatVersion::V1_2 => {
                let len = reader.read_count(1)?;
                let mut section = Reader::new(reader.take(len)?);
                match tag {
                    TAG_HEIGHTMAP => heights = Some(read_heights(&mut section)?),
                    TAG_LOD => lods = read_lods(&mut section)?,
                    _ => log::debug!("Skipping unknown terrain section '{}' ({} bytes)", tag, len),
                }
            }
            _ => match tag {
                TAG_HEIGHTMAP => heights = Some(read_heights(&mut reader)?),
                TAG_LOD => lods = read_lods(&mut reader)?,
                _ => {
                    log::warn!(
                        "Unknown terrain section '{}' in version {} file, ignoring the remaining {} bytes",
                        tag,
                        header,
                        reader.remaining()
                    );
                    break;
                }
            },
        }
    }

    let heights = heights.ok_or_else(|| Error::format("terrain file has no HEIGHTMAP section"))?;
    Ok(TerrainFileData { heights, lods, version })
}

fn decode_legacy(bytes: &[u8]) -> Result<TerrainFileData> {
    if bytes.len() % 4 != 0 {
        return Err(Error::format(format!(
            "legacy terrain data of {} bytes is not a float array",
            bytes.len()
        )));
    }
    let heights = Reader::new(bytes).read_f32s(bytes.len() / 4)?;
    log::debug!("Read legacy terrain data ({} samples)", heights.len());
    Ok(TerrainFileData {
        heights,
        lods: Vec::new(),
        version: FormatVersion::Legacy,
    })
}

fn read_heights(reader: &mut Reader<'_>) -> Result<Vec<f32>> {
    let count = reader.read_count(4)?;
    reader.read_f32s(count)
}

fn read_lods(reader: &mut Reader<'_>) -> Result<Vec<Vec<LodMeshData>>> {
    let level_count = reader.read_count(4)?;
    let mut levels = Vec::with_capacity(level_count);
    for _ in 0..level_count {
        let mesh_count = reader.read_count(8)?;
        let mut meshes = Vec::with_capacity(mesh_count);
        for _ in 0..mesh_count {
            let float_count = reader.read_count(4)?;
            let vertices = reader.read_f32s(float_count)?;
            let index_count = reader.read_count(2)?;
            let indices = reader.read_u16s(index_count)?;
            meshes.push(LodMeshData::new(vertices, indices));
        }
        levels.push(meshes);
    }
    Ok(levels)
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Write a terrain file, replacing `path` only once the write succeeded
pub fn save_terrain_file(path: &Path, data: &TerrainFileData, version: FormatVersion) -> Result<()> {
    let bytes = encode(data, version)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(path);
    let file = File::create(&temp_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    drop(writer);

    std::fs::rename(&temp_path, path)?;
    log::debug!("Saved terrain file {} ({} bytes, {:?})", path.display(), bytes.len(), version);
    Ok(())
}

/// Sibling path for in-progress writes: `island.terra` -> `island.terra.tmp`
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read and decode a terrain file
pub fn load_terrain_file(path: &Path) -> Result<TerrainFileData> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Async variant of [`save_terrain_file`]
pub async fn save_terrain_file_async(path: &Path, data: &TerrainFileData, version: FormatVersion) -> Result<()> {
    let bytes = encode(data, version)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp_path = temp_path_for(path);
    tokio::fs::write(&temp_path, &bytes).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Async variant of [`load_terrain_file`]
pub async fn load_terrain_file_async(path: &Path) -> Result<TerrainFileData> {
    let bytes = tokio::fs::read(path).await?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TerrainFileData {
        let heights = (0..16).map(|i| i as f32 * 0.25 - 1.0).collect();
        let lods = vec![
            vec![LodMeshData::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], vec![0, 1, 2])],
            vec![
                LodMeshData::new(vec![1.5; 6], vec![1, 0]),
                LodMeshData::new(Vec::new(), Vec::new()),
            ],
        ];
        TerrainFileData::new(heights, lods)
    }

    fn be_string(s: &str) -> Vec<u8> {
        let mut out = (s.len() as u16).to_be_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn test_round_trip_both_versions() {
        for version in [FormatVersion::V1_1, FormatVersion::V1_2] {
            let data = sample();
            let bytes = encode(&data, version).expect("encodes");
            let decoded = decode(&bytes).expect("decodes");
            assert_eq!(decoded.heights, data.heights);
            assert_eq!(decoded.lods, data.lods);
            assert_eq!(decoded.version, version);
        }
    }

    #[test]
    fn test_v1_1_byte_layout() {
        let data = TerrainFileData::new(vec![1.0, 2.0], Vec::new());
        let bytes = encode(&data, FormatVersion::V1_1).expect("encodes");

        let mut expected = be_string("1.1");
        expected.extend(be_string("HEIGHTMAP"));
        expected.extend(2i32.to_be_bytes());
        expected.extend(1.0f32.to_be_bytes());
        expected.extend(2.0f32.to_be_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_legacy_fixture() {
        // Headerless float array as written by old versions
        let mut bytes = Vec::new();
        for h in [0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0] {
            bytes.extend(h.to_be_bytes());
        }
        let decoded = decode(&bytes).expect("legacy decodes");
        assert!(decoded.is_legacy());
        assert_eq!(decoded.heights.len(), 9);
        assert_eq!(decoded.heights[4], 4.0);
        assert!(decoded.lods.is_empty());
    }

    #[test]
    fn test_legacy_round_trip_drops_lods() {
        let data = sample();
        let bytes = encode(&data, FormatVersion::Legacy).expect("encodes");
        assert_eq!(bytes.len(), 16 * 4);
        let decoded = decode(&bytes).expect("decodes");
        assert_eq!(decoded.heights, data.heights);
        assert!(decoded.lods.is_empty());
    }

    #[test]
    fn test_legacy_rejects_partial_float() {
        let bytes = [0u8, 0, 0, 0, 0x3f];
        assert!(matches!(decode(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_sniff_version() {
        assert_eq!(sniff_version(&be_string("1.1")), Some("1.1"));
        assert_eq!(sniff_version(&be_string("12.30")), Some("12.30"));
        assert_eq!(sniff_version(&be_string("1.")), None);
        assert_eq!(sniff_version(&be_string("v1.1")), None);
        assert_eq!(sniff_version(&be_string("")), None);
        assert_eq!(sniff_version(&[0, 3, b'1']), None);
        assert_eq!(sniff_version(&[]), None);
    }

    #[test]
    fn test_v1_2_skips_unknown_section() {
        let mut bytes = be_string("1.2");
        bytes.extend(be_string("SPLAT"));
        bytes.extend(5i32.to_be_bytes());
        bytes.extend([9u8; 5]);
        bytes.extend(be_string("HEIGHTMAP"));
        bytes.extend(8i32.to_be_bytes());
        bytes.extend(1i32.to_be_bytes());
        bytes.extend(7.5f32.to_be_bytes());

        let decoded = decode(&bytes).expect("decodes");
        assert_eq!(decoded.heights, vec![7.5]);
        assert_eq!(decoded.version, FormatVersion::V1_2);
    }

    #[test]
    fn test_v1_1_stops_at_unknown_tag() {
        let mut bytes = encode(&TerrainFileData::new(vec![3.0; 4], Vec::new()), FormatVersion::V1_1).expect("encodes");
        bytes.extend(be_string("FOLIAGE"));
        bytes.extend([1u8, 2, 3]);
        // Never reached
        bytes.extend(be_string("LOD"));
        bytes.extend(1i32.to_be_bytes());

        let decoded = decode(&bytes).expect("keeps sections read so far");
        assert_eq!(decoded.heights, vec![3.0; 4]);
        assert!(decoded.lods.is_empty());
    }

    #[test]
    fn test_newer_version_uses_lengths() {
        let mut bytes = encode(&TerrainFileData::new(vec![2.0], Vec::new()), FormatVersion::V1_2).expect("encodes");
        // Rewrite the header "1.2" -> "1.9"
        bytes[4] = b'9';
        let decoded = decode(&bytes).expect("decodes");
        assert_eq!(decoded.heights, vec![2.0]);
        assert_eq!(decoded.version, FormatVersion::V1_2);
    }

    #[test]
    fn test_truncated_input_is_format_error() {
        let bytes = encode(&sample(), FormatVersion::V1_1).expect("encodes");
        for cut in [bytes.len() - 1, bytes.len() - 7, 12] {
            let result = decode(&bytes[..cut]);
            assert!(matches!(result, Err(Error::Format(_))), "cut at {}", cut);
        }
    }

    #[test]
    fn test_missing_heightmap_is_format_error() {
        let bytes = be_string("1.2");
        assert!(matches!(decode(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_negative_count_is_format_error() {
        let mut bytes = be_string("1.1");
        bytes.extend(be_string("HEIGHTMAP"));
        bytes.extend((-1i32).to_be_bytes());
        assert!(matches!(decode(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_indices_above_i16_range() {
        let mesh = LodMeshData::new(vec![0.0; 3], vec![0, 32767, 32768, 40000, 65535]);
        let data = TerrainFileData::new(vec![0.0; 4], vec![vec![mesh.clone()]]);
        let bytes = encode(&data, FormatVersion::V1_1).expect("encodes");

        // 40000 is stored as the signed short -25536
        let stored = (-25536i16).to_be_bytes();
        assert!(bytes.windows(2).any(|w| w == stored));

        let decoded = decode(&bytes).expect("decodes");
        assert_eq!(decoded.lods[0][0].indices, mesh.indices);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("terrains").join("island.terra");

        save_terrain_file(&path, &sample(), FormatVersion::V1_2).expect("saves");
        assert!(!dir.path().join("terrains").join("island.terra.tmp").exists());

        let loaded = load_terrain_file(&path).expect("loads");
        assert_eq!(loaded.heights, sample().heights);
        assert_eq!(loaded.lods, sample().lods);
    }

    #[test]
    fn test_save_keeps_sibling_with_same_stem() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sibling = dir.path().join("island.tmp");
        std::fs::write(&sibling, b"editor scratch").expect("writes sibling");

        let path = dir.path().join("island.terra");
        save_terrain_file(&path, &sample(), FormatVersion::V1_1).expect("saves");
        assert_eq!(std::fs::read(&sibling).expect("sibling kept"), b"editor scratch");

        // A target that already ends in .tmp is still written through a temp file
        let scratch = dir.path().join("scratch.tmp");
        save_terrain_file(&scratch, &sample(), FormatVersion::V1_1).expect("saves");
        assert_eq!(temp_path_for(&scratch), dir.path().join("scratch.tmp.tmp"));
        assert!(!temp_path_for(&scratch).exists());
        assert_eq!(load_terrain_file(&scratch).expect("loads").heights, sample().heights);
    }

    #[test]
    fn test_default_writer_is_v1_1() {
        assert_eq!(FormatVersion::default(), FormatVersion::V1_1);
        let bytes = encode(&sample(), FormatVersion::default()).expect("encodes");
        assert!(bytes.starts_with(&be_string("1.1")));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = load_terrain_file(&dir.path().join("missing.terra"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("async.terra");

        save_terrain_file_async(&path, &sample(), FormatVersion::V1_1).await.expect("saves");
        let loaded = load_terrain_file_async(&path).await.expect("loads");
        assert_eq!(loaded.lods, sample().lods);
    }
}
