//! Flat binary tensor files.
//!
//! Layout, little-endian, with `usize`-wide size fields:
//!
//! ```text
//! [rank][shape[0]] ... [shape[rank-1]][payload: product(shape) x f32, row-major]
//! ```
//!
//! Two legacy matrix layouts are kept for files produced by older runs: one
//! stores rank 2 followed by rows and cols (identical to the general layout
//! for a rank-2 tensor), the other stores a rank of 1 while still writing both
//! rows and cols.

use crate::error::{Result, SimError};
use crate::linalg::Matrix;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const WORD: usize = std::mem::size_of::<usize>();
/// Elements decoded per read.
const READ_CHUNK: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixLayout {
    #[default]
    /// Header `[2, rows, cols]`.
    RankTwo,
    /// Header `[1, rows, cols]`; the rank field does not match the stored
    /// shape.
    LegacyRankOne,
}

fn write_word<W: Write>(writer: &mut W, value: usize) -> std::io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

fn write_payload<W: Write>(writer: &mut W, elements: &[f32]) -> std::io::Result<()> {
    for value in elements {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn read_word<R: Read>(reader: &mut R) -> std::io::Result<usize> {
    let mut bytes = [0u8; WORD];
    reader.read_exact(&mut bytes)?;
    Ok(usize::from_le_bytes(bytes))
}

pub fn encode_tensor<W: Write>(writer: &mut W, tensor: &Tensor) -> std::io::Result<()> {
    write_word(writer, tensor.ndims())?;
    for &dim in tensor.shape() {
        write_word(writer, dim)?;
    }
    write_payload(writer, tensor.as_slice())
}

pub fn encode_matrix<W: Write>(
    writer: &mut W,
    matrix: &Matrix<f32>,
    layout: MatrixLayout,
) -> std::io::Result<()> {
    let rank = match layout {
        MatrixLayout::RankTwo => 2,
        MatrixLayout::LegacyRankOne => 1,
    };
    write_word(writer, rank)?;
    write_word(writer, matrix.rows())?;
    write_word(writer, matrix.cols())?;
    write_payload(writer, matrix.as_slice())
}

fn invalid_data(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}

/// Parses the general layout. Trailing bytes after the payload are rejected.
pub fn decode_tensor<R: Read>(reader: &mut R) -> std::io::Result<Tensor> {
    let rank = read_word(reader)?;
    if rank > 64 {
        return Err(invalid_data(format!("implausible tensor rank {rank}")));
    }
    let mut shape = Vec::with_capacity(rank);
    for _ in 0..rank {
        shape.push(read_word(reader)?);
    }
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| invalid_data(format!("tensor shape {shape:?} overflows usize")))?;

    // Grows only as payload bytes arrive.
    let mut elements = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK * 4];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(READ_CHUNK);
        let bytes = &mut chunk[..n * 4];
        reader.read_exact(bytes)?;
        elements
            .try_reserve(n)
            .map_err(|_| invalid_data(format!("cannot allocate {count} elements")))?;
        elements.extend(
            bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        remaining -= n;
    }
    let tensor = Tensor::from_vec(&shape, elements).map_err(|err| invalid_data(err.to_string()))?;

    let mut rest = [0u8; 1];
    if reader.read(&mut rest)? != 0 {
        return Err(invalid_data(
            "payload is longer than the header describes".to_string(),
        ));
    }
    Ok(tensor)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SimError + '_ {
    move |source| SimError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_file(
    path: &Path,
    encode: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
) -> Result<()> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    encode(&mut writer).map_err(io_error(path))?;
    writer.flush().map_err(io_error(path))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Writes `tensor` with its true rank and full shape.
pub fn write_tensor<P: AsRef<Path>>(path: P, tensor: &Tensor) -> Result<()> {
    write_file(path.as_ref(), |w| encode_tensor(w, tensor))
}

pub fn write_matrix<P: AsRef<Path>>(
    path: P,
    matrix: &Matrix<f32>,
    layout: MatrixLayout,
) -> Result<()> {
    write_file(path.as_ref(), |w| encode_matrix(w, matrix, layout))
}

pub fn read_tensor<P: AsRef<Path>>(path: P) -> Result<Tensor> {
    let path = path.as_ref();
    let file = File::open(path).map_err(io_error(path))?;
    decode_tensor(&mut BufReader::new(file)).map_err(io_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(bytes: &[u8], count: usize) -> Vec<usize> {
        bytes
            .chunks_exact(WORD)
            .take(count)
            .map(|chunk| {
                let mut word = [0u8; WORD];
                word.copy_from_slice(chunk);
                usize::from_le_bytes(word)
            })
            .collect()
    }

    #[test]
    fn tensor_header_carries_true_rank_and_shape() {
        let tensor = Tensor::from_vec(&[2, 1, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .expect("tensor");
        let mut bytes = Vec::new();
        encode_tensor(&mut bytes, &tensor).expect("encode");

        assert_eq!(bytes.len(), 4 * WORD + 6 * 4);
        assert_eq!(words(&bytes, 4), vec![3, 2, 1, 3]);
        let payload = &bytes[4 * WORD..];
        assert_eq!(&payload[..4], &1.0f32.to_le_bytes());
        assert_eq!(&payload[20..], &6.0f32.to_le_bytes());
    }

    #[test]
    fn decode_reads_back_what_encode_wrote() {
        let tensor = Tensor::from_vec(&[3, 2], vec![0.5, -1.0, 2.0, 1e5, 0.0, -3.25])
            .expect("tensor");
        let mut bytes = Vec::new();
        encode_tensor(&mut bytes, &tensor).expect("encode");
        let decoded = decode_tensor(&mut bytes.as_slice()).expect("decode");
        assert_eq!(decoded, tensor);
    }

    #[test]
    fn matrix_layouts_differ_only_in_rank_field() {
        let m = Matrix::from_row_slice(2, 2, &[1.0f32, 2.0, 3.0, 4.0]).expect("matrix");
        let mut rank_two = Vec::new();
        let mut rank_one = Vec::new();
        encode_matrix(&mut rank_two, &m, MatrixLayout::RankTwo).expect("encode");
        encode_matrix(&mut rank_one, &m, MatrixLayout::LegacyRankOne).expect("encode");

        assert_eq!(words(&rank_two, 3), vec![2, 2, 2]);
        assert_eq!(words(&rank_one, 3), vec![1, 2, 2]);
        assert_eq!(rank_two[WORD..], rank_one[WORD..]);

        let mut general = Vec::new();
        encode_tensor(&mut general, &m.to_tensor().expect("tensor")).expect("encode");
        assert_eq!(general, rank_two);
    }

    #[test]
    fn decode_rejects_truncated_and_oversized_payloads() {
        let tensor = Tensor::from_vec(&[2], vec![1.0, 2.0]).expect("tensor");
        let mut bytes = Vec::new();
        encode_tensor(&mut bytes, &tensor).expect("encode");

        let truncated = &bytes[..bytes.len() - 1];
        assert!(decode_tensor(&mut &truncated[..]).is_err());

        let mut longer = bytes.clone();
        longer.extend_from_slice(&[0, 0, 0, 0]);
        assert!(decode_tensor(&mut longer.as_slice()).is_err());
    }

    #[test]
    fn decode_of_header_without_payload_fails_fast() {
        let mut bytes = Vec::new();
        write_word(&mut bytes, 1).expect("rank");
        write_word(&mut bytes, 1 << 28).expect("shape");
        let err = decode_tensor(&mut bytes.as_slice()).expect_err("payload is missing");
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);

        let mut overflowing = Vec::new();
        write_word(&mut overflowing, 2).expect("rank");
        write_word(&mut overflowing, usize::MAX).expect("shape");
        write_word(&mut overflowing, 2).expect("shape");
        let err = decode_tensor(&mut overflowing.as_slice()).expect_err("shape overflows");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn decode_spans_several_read_chunks() {
        let len = READ_CHUNK * 2 + 3;
        let elements: Vec<f32> = (0..len).map(|i| i as f32).collect();
        let tensor = Tensor::from_vec(&[len], elements).expect("tensor");
        let mut bytes = Vec::new();
        encode_tensor(&mut bytes, &tensor).expect("encode");
        assert_eq!(decode_tensor(&mut bytes.as_slice()).expect("decode"), tensor);
    }

    #[test]
    fn file_round_trip_and_io_failure() {
        let dir = std::env::temp_dir().join(format!("tensim-binary-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("grid.bin");

        let tensor = Tensor::from_vec(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).expect("tensor");
        write_tensor(&path, &tensor).expect("write");
        assert_eq!(read_tensor(&path).expect("read"), tensor);

        let missing = dir.join("no-such-dir").join("out.bin");
        let err = write_tensor(&missing, &tensor).expect_err("write should fail");
        assert!(matches!(err, SimError::Io { .. }));

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }
}
