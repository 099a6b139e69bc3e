//! Minimal NumPy `.npy` codec for 2-D `f64` matrices.
//!
//! Writes format version 1.0 with descriptor `<f8` in C order. Reads
//! versions 1.x and 2.x, either memory order, so matrices saved by NumPy
//! itself load too. Values are copied bit for bit.

use std::io::{self, Read, Write};

use ndarray::{Array2, ShapeBuilder};
use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

#[derive(Debug, Error)]
pub enum NpyError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid npy data: {0}")]
    Format(String),
}

fn format_err(msg: impl Into<String>) -> NpyError {
    NpyError::Format(msg.into())
}

pub fn write_npy<W: Write>(mut writer: W, matrix: &Array2<f64>) -> Result<(), NpyError> {
    let (rows, cols) = matrix.dim();
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({rows}, {cols}), }}"
    );
    // magic + version + u16 length + header + '\n' must be a multiple of 64
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| format_err("header does not fit a version 1.0 file"))?;

    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(header.as_bytes())?;

    let mut data = Vec::with_capacity(rows * cols * 8);
    for value in matrix.iter() {
        data.extend_from_slice(&value.to_le_bytes());
    }
    writer.write_all(&data)?;
    writer.flush()?;
    Ok(())
}

pub fn read_npy<R: Read>(mut reader: R) -> Result<Array2<f64>, NpyError> {
    let mut magic = [0u8; 6];
    read_exact(&mut reader, &mut magic)?;
    if &magic != MAGIC {
        return Err(format_err("missing NUMPY magic string"));
    }

    let mut version = [0u8; 2];
    read_exact(&mut reader, &mut version)?;
    let header_len = match version[0] {
        1 => {
            let mut len = [0u8; 2];
            read_exact(&mut reader, &mut len)?;
            u16::from_le_bytes(len) as usize
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            read_exact(&mut reader, &mut len)?;
            u32::from_le_bytes(len) as usize
        }
        major => return Err(format_err(format!("unsupported format version {major}"))),
    };

    let mut header = vec![0u8; header_len];
    read_exact(&mut reader, &mut header)?;
    let header =
        String::from_utf8(header).map_err(|_| format_err("header is not valid text"))?;
    let header = Header::parse(&header)?;

    let count = header
        .rows
        .checked_mul(header.cols)
        .ok_or_else(|| format_err("shape overflows"))?;
    let mut bytes = vec![0u8; count * 8];
    read_exact(&mut reader, &mut bytes)?;
    let data: Vec<f64> = bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect();

    let shape = (header.rows, header.cols);
    let matrix = if header.fortran_order {
        Array2::from_shape_vec(shape.f(), data)
    } else {
        Array2::from_shape_vec(shape, data)
    };
    matrix.map_err(|err| format_err(err.to_string()))
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), NpyError> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => format_err("file is truncated"),
        _ => NpyError::Io(err),
    })
}

#[derive(Debug, PartialEq, Eq)]
struct Header {
    fortran_order: bool,
    rows: usize,
    cols: usize,
}

impl Header {
    fn parse(header: &str) -> Result<Self, NpyError> {
        let descr = value_after(header, "'descr'")?;
        let descr = descr
            .trim_start()
            .strip_prefix('\'')
            .and_then(|rest| rest.split('\'').next())
            .ok_or_else(|| format_err("malformed descr"))?;
        if descr != "<f8" {
            return Err(format_err(format!("unsupported dtype {descr}")));
        }

        let order = value_after(header, "'fortran_order'")?.trim_start();
        let fortran_order = if order.starts_with("True") {
            true
        } else if order.starts_with("False") {
            false
        } else {
            return Err(format_err("malformed fortran_order"));
        };

        let shape = value_after(header, "'shape'")?.trim_start();
        let shape = shape
            .strip_prefix('(')
            .and_then(|rest| rest.split(')').next())
            .ok_or_else(|| format_err("malformed shape"))?;
        let dims = shape
            .split(',')
            .map(str::trim)
            .filter(|dim| !dim.is_empty())
            .map(|dim| dim.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| format_err("shape holds a non-integer"))?;
        let &[rows, cols] = dims.as_slice() else {
            return Err(format_err(format!("expected a 2-D array, got shape ({shape})")));
        };

        Ok(Self {
            fortran_order,
            rows,
            cols,
        })
    }
}

fn value_after<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let start = header
        .find(key)
        .ok_or_else(|| format_err(format!("header lacks {key}")))?;
    let rest = &header[start + key.len()..];
    rest.trim_start()
        .strip_prefix(':')
        .ok_or_else(|| format_err(format!("header lacks a value for {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn round_trip_is_exact() {
        let matrix = array![
            [0.1 * 0.1, -1e-300, f64::MAX],
            [0.0, -0.0, 1.0 / 3.0]
        ];
        let mut bytes = Vec::new();
        write_npy(&mut bytes, &matrix).unwrap();

        let restored = read_npy(bytes.as_slice()).unwrap();
        assert_eq!(restored.dim(), (2, 3));
        for (a, b) in matrix.iter().zip(restored.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn header_is_aligned_and_numpy_shaped() {
        let matrix = Array2::<f64>::zeros((4, 7));
        let mut bytes = Vec::new();
        write_npy(&mut bytes, &matrix).unwrap();

        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % ALIGNMENT, 0);
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (4, 7), }"));
        assert!(header.ends_with('\n'));
        assert_eq!(bytes.len(), 10 + header_len + 4 * 7 * 8);
    }

    #[test]
    fn empty_matrix_round_trips() {
        let matrix = Array2::<f64>::zeros((0, 0));
        let mut bytes = Vec::new();
        write_npy(&mut bytes, &matrix).unwrap();
        assert_eq!(read_npy(bytes.as_slice()).unwrap().dim(), (0, 0));
    }

    #[test]
    fn fortran_order_is_honoured() {
        let header = "{'descr': '<f8', 'fortran_order': True, 'shape': (2, 2), }\n";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        for value in [1.0f64, 3.0, 2.0, 4.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let matrix = read_npy(bytes.as_slice()).unwrap();
        assert_eq!(matrix, array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn rejects_truncated_and_foreign_data() {
        let mut bytes = Vec::new();
        write_npy(&mut bytes, &array![[1.0, 2.0]]).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(read_npy(bytes.as_slice()), Err(NpyError::Format(_))));

        assert!(matches!(
            read_npy(&b"not a numpy file at all"[..]),
            Err(NpyError::Format(_))
        ));

        let header = "{'descr': '<i4', 'fortran_order': False, 'shape': (1, 1), }\n";
        assert!(Header::parse(header).is_err());
        let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (3,), }\n";
        assert!(Header::parse(header).is_err());
    }
}
