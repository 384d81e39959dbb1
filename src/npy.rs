//! Reader and writer for NumPy `.npy` files holding a dense `float64` array
//!
//! Files are written as format version 1.0, little-endian `<f8`, C order. Reading also
//! accepts the 2.0/3.0 header layout and big-endian payloads.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use crate::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
/// Magic, version and the header length field of a 1.0 file
const PREAMBLE_LEN: usize = MAGIC.len() + 2 + 2;
const ALIGN: usize = 64;
/// Longest header accepted when reading
const MAX_HEADER_LEN: usize = 1 << 16;

/// A dense array as read from disk
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

/// Write `data` with the given `shape` in `.npy` format
///
/// **Panics** if `shape` does not describe exactly `data.len()` elements
pub fn write<W: Write>(mut writer: W, shape: &[usize], data: &[f64]) -> Result<(), Error> {
    assert_eq!(
        shape.iter().product::<usize>(),
        data.len(),
        "Shape {shape:?} does not cover {} elements",
        data.len()
    );

    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': {}, }}",
        shape_repr(shape)
    );
    // Header is padded with spaces and terminated by a newline so the payload starts aligned
    let unpadded = PREAMBLE_LEN + header.len() + 1;
    header.extend(std::iter::repeat(' ').take((ALIGN - unpadded % ALIGN) % ALIGN));
    header.push('\n');
    let header_len = u16::try_from(header.len())
        .map_err(|_| Error::BadHeader(format!("header of {} bytes is too long", header.len())))?;

    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(header.as_bytes())?;
    for value in data {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a `float64` array in `.npy` format
pub fn read<R: Read>(mut reader: R) -> Result<Array, Error> {
    let mut magic = [0; 6];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(Error::BadMagic);
    }

    let mut version = [0; 2];
    reader.read_exact(&mut version)?;
    let header_len = match version[0] {
        1 => {
            let mut len = [0; 2];
            reader.read_exact(&mut len)?;
            u16::from_le_bytes(len) as usize
        }
        2 | 3 => {
            let mut len = [0; 4];
            reader.read_exact(&mut len)?;
            u32::from_le_bytes(len) as usize
        }
        _ => return Err(Error::UnsupportedVersion(version[0], version[1])),
    };

    if header_len > MAX_HEADER_LEN {
        return Err(Error::BadHeader(format!(
            "header of {header_len} bytes exceeds {MAX_HEADER_LEN}"
        )));
    }
    let mut header = vec![0; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8(header)
        .map_err(|_| Error::BadHeader(String::from("header is not valid text")))?;
    let Header {
        big_endian,
        fortran_order,
        shape,
    } = Header::parse(&header)?;
    if fortran_order {
        return Err(Error::FortranOrder);
    }

    let expected = shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .and_then(|count| count.checked_mul(8))
        .ok_or_else(|| Error::BadHeader(format!("shape {shape:?} is too large")))?;

    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;
    if payload.len() != expected {
        return Err(Error::PayloadSize {
            expected,
            found: payload.len(),
        });
    }

    let data = payload
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0; 8];
            bytes.copy_from_slice(chunk);
            if big_endian {
                f64::from_be_bytes(bytes)
            } else {
                f64::from_le_bytes(bytes)
            }
        })
        .collect();

    Ok(Array { shape, data })
}

pub fn save(path: impl AsRef<Path>, shape: &[usize], data: &[f64]) -> Result<(), Error> {
    let file = File::create(path)?;
    write(BufWriter::new(file), shape, data)
}

pub fn load(path: impl AsRef<Path>) -> Result<Array, Error> {
    let file = File::open(path)?;
    read(BufReader::new(file))
}

/// Python tuple literal for a shape
fn shape_repr(shape: &[usize]) -> String {
    match shape {
        [n] => format!("({n},)"),
        _ => {
            let dims: Vec<String> = shape.iter().map(usize::to_string).collect();
            format!("({})", dims.join(", "))
        }
    }
}

struct Header {
    big_endian: bool,
    fortran_order: bool,
    shape: Vec<usize>,
}

impl Header {
    /// Parse the dict literal numpy writes, e.g.
    /// `{'descr': '<f8', 'fortran_order': False, 'shape': (8, 4), }`
    fn parse(header: &str) -> Result<Self, Error> {
        let header = header.trim();
        if !header.starts_with('{') || !header.ends_with('}') {
            return Err(Error::BadHeader(format!("expected a dict, found `{header}`")));
        }

        let descr = quoted(field(header, "descr")?)?;
        let big_endian = match descr {
            "<f8" | "=f8" | "f8" => false,
            ">f8" => true,
            other => return Err(Error::UnsupportedDtype(other.to_string())),
        };

        let order = field(header, "fortran_order")?;
        let fortran_order = if order.starts_with("True") {
            true
        } else if order.starts_with("False") {
            false
        } else {
            return Err(Error::BadHeader(String::from("`fortran_order` is not a bool")));
        };

        let shape = field(header, "shape")?;
        let close = shape
            .find(')')
            .filter(|_| shape.starts_with('('))
            .ok_or_else(|| Error::BadHeader(String::from("`shape` is not a tuple")))?;
        let shape = shape[1..close]
            .split(',')
            .map(str::trim)
            .filter(|dim| !dim.is_empty())
            .map(|dim| {
                dim.parse::<usize>()
                    .map_err(|_| Error::BadHeader(format!("bad dimension `{dim}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            big_endian,
            fortran_order,
            shape,
        })
    }
}

/// Text following `'key':` in the header dict
fn field<'a>(header: &'a str, key: &str) -> Result<&'a str, Error> {
    let start = [format!("'{key}'"), format!("\"{key}\"")]
        .iter()
        .find_map(|pattern| header.find(pattern.as_str()).map(|i| i + pattern.len()))
        .ok_or_else(|| Error::BadHeader(format!("missing key `{key}`")))?;
    header[start..]
        .trim_start()
        .strip_prefix(':')
        .map(str::trim_start)
        .ok_or_else(|| Error::BadHeader(format!("no value for `{key}`")))
}

/// Contents of a leading single- or double-quoted string
fn quoted(text: &str) -> Result<&str, Error> {
    let quote = text
        .chars()
        .next()
        .filter(|&c| c == '\'' || c == '"')
        .ok_or_else(|| Error::BadHeader(String::from("`descr` is not a string")))?;
    let rest = &text[1..];
    rest.find(quote)
        .map(|end| &rest[..end])
        .ok_or_else(|| Error::BadHeader(String::from("unterminated string")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(shape: &[usize], data: &[f64]) -> Vec<u8> {
        let mut bytes = Vec::new();
        write(&mut bytes, shape, data).unwrap();
        bytes
    }

    /// Overwrite the first occurrence of `from` with the same-length `to`
    fn patch(bytes: &mut [u8], from: &str, to: &str) {
        assert_eq!(from.len(), to.len());
        let at = bytes
            .windows(from.len())
            .position(|w| w == from.as_bytes())
            .unwrap();
        bytes[at..at + to.len()].copy_from_slice(to.as_bytes());
    }

    #[test]
    fn header_is_aligned_and_numpy_shaped() {
        let bytes = encode(&[2, 3], &[0.0; 6]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((PREAMBLE_LEN + header_len) % ALIGN, 0, "Payload is aligned");
        assert_eq!(bytes.len(), PREAMBLE_LEN + header_len + 6 * 8);

        let header = std::str::from_utf8(&bytes[PREAMBLE_LEN..PREAMBLE_LEN + header_len]).unwrap();
        assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }"));
        assert!(header.ends_with('\n'));
    }

    #[test]
    fn one_dimensional_shape_keeps_trailing_comma() {
        assert_eq!(shape_repr(&[5]), "(5,)");
        assert_eq!(shape_repr(&[8, 8, 8, 8, 4]), "(8, 8, 8, 8, 4)");
        assert_eq!(shape_repr(&[]), "()");
    }

    #[test]
    fn reads_back_values_bit_for_bit() {
        let data = [0.1, -0.0, f64::MIN_POSITIVE, 1e300, -42.5, f64::EPSILON];
        let array = read(encode(&[3, 2], &data).as_slice()).unwrap();
        assert_eq!(array.shape, [3, 2]);
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&array.data), bits(&data));
    }

    #[test]
    fn reads_numpy_written_header() {
        // Layout produced by `np.save` for `np.arange(2.0)`
        let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (2,), }";
        let mut bytes = MAGIC.to_vec();
        bytes.extend([1, 0]);
        let padded = format!("{header:<117}\n");
        bytes.extend((padded.len() as u16).to_le_bytes());
        bytes.extend(padded.as_bytes());
        bytes.extend(0.0f64.to_le_bytes());
        bytes.extend(1.0f64.to_le_bytes());

        let array = read(bytes.as_slice()).unwrap();
        assert_eq!(array.shape, [2]);
        assert_eq!(array.data, [0.0, 1.0]);
    }

    #[test]
    fn reads_version_two_big_endian() {
        let header = "{\"descr\": \">f8\", \"fortran_order\": False, \"shape\": (1,)}\n";
        let mut bytes = MAGIC.to_vec();
        bytes.extend([2, 0]);
        bytes.extend((header.len() as u32).to_le_bytes());
        bytes.extend(header.as_bytes());
        bytes.extend(2.5f64.to_be_bytes());

        let array = read(bytes.as_slice()).unwrap();
        assert_eq!(array.data, [2.5]);
    }

    #[test]
    fn rejects_malformed_files() {
        assert!(matches!(read(&b"\x93NUMPZ\x01\x00"[..]), Err(Error::BadMagic)));

        let mut bytes = encode(&[2], &[1.0, 2.0]);
        bytes[6] = 9;
        assert!(matches!(
            read(bytes.as_slice()),
            Err(Error::UnsupportedVersion(9, 0))
        ));

        let mut bytes = encode(&[2], &[1.0, 2.0]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            read(bytes.as_slice()),
            Err(Error::PayloadSize {
                expected: 16,
                found: 13
            })
        ));

        let mut fortran = encode(&[1], &[1.0]);
        patch(&mut fortran, "False", "True ");
        assert!(matches!(read(fortran.as_slice()), Err(Error::FortranOrder)));
    }

    #[test]
    fn rejects_shapes_too_large_to_address() {
        let mut bytes = encode(&[2, 3], &[0.0; 6]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        bytes.truncate(PREAMBLE_LEN + header_len);
        let huge = format!("({}, 8)", usize::MAX / 8 + 1);
        let header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': {huge}, }}\n");
        bytes.splice(PREAMBLE_LEN..PREAMBLE_LEN + header_len, header.bytes());
        bytes[8..10].copy_from_slice(&(header.len() as u16).to_le_bytes());

        assert!(matches!(
            read(bytes.as_slice()),
            Err(Error::BadHeader(msg)) if msg.contains("too large")
        ));
    }

    #[test]
    fn rejects_oversized_header_length() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend([2, 0]);
        bytes.extend(u32::MAX.to_le_bytes());
        assert!(matches!(
            read(bytes.as_slice()),
            Err(Error::BadHeader(msg)) if msg.contains("exceeds")
        ));
    }

    #[test]
    fn rejects_other_dtypes() {
        let mut ints = encode(&[1], &[1.0]);
        patch(&mut ints, "<f8", "<i8");
        assert!(matches!(
            read(ints.as_slice()),
            Err(Error::UnsupportedDtype(d)) if d == "<i8"
        ));
    }
}
