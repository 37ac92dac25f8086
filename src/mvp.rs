//! MVP uniform block (spec §6.6): three 4x4 column-major float matrices
//! (model, view, proj) plus a float time, padded to 16-byte alignment. The
//! uniform every builtin visual's `Mvp` source (see [`crate::builtin`])
//! binds to, owned per-panel by [`crate::panel::Panel::mvp_region`].

use cgmath::{Matrix4, SquareMatrix};

/// Byte size of one [`Mvp`] once padded to a 16-byte stride: three 4x4
/// `f32` matrices (192 bytes) plus `time` (4 bytes), rounded up to the next
/// 16-byte multiple, per spec §6.6.
pub const BYTE_SIZE: u64 = 208;

#[derive(Copy, Clone, Debug)]
pub struct Mvp {
    pub model: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub proj: Matrix4<f32>,
    pub time: f32,
}

impl Mvp {
    pub fn identity(time: f32) -> Self {
        Self {
            model: Matrix4::identity(),
            view: Matrix4::identity(),
            proj: Matrix4::identity(),
            time,
        }
    }

    /// Column-major matrices followed by `time`, zero-padded out to
    /// [`BYTE_SIZE`] bytes to match the uniform block layout the builtin
    /// shaders declare.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BYTE_SIZE as usize);
        for matrix in [&self.model, &self.view, &self.proj] {
            let cols: [[f32; 4]; 4] = (*matrix).into();
            for col in cols {
                for v in col {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        out.extend_from_slice(&self.time.to_le_bytes());
        out.resize(BYTE_SIZE as usize, 0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_layout_is_16_byte_aligned_and_carries_time() {
        let mvp = Mvp {
            time: 1.5,
            ..Mvp::identity(0.0)
        };
        let bytes = mvp.to_bytes();
        assert_eq!(bytes.len() as u64, BYTE_SIZE);
        assert_eq!(BYTE_SIZE % 16, 0);
        let time_bytes: [u8; 4] = bytes[192..196].try_into().unwrap();
        assert_eq!(f32::from_le_bytes(time_bytes), 1.5);
    }

    #[test]
    fn identity_matrix_columns_round_trip() {
        let bytes = Mvp::identity(0.0).to_bytes();
        let first: [u8; 4] = bytes[0..4].try_into().unwrap();
        let second: [u8; 4] = bytes[4..8].try_into().unwrap();
        assert_eq!(f32::from_le_bytes(first), 1.0);
        assert_eq!(f32::from_le_bytes(second), 0.0);
    }
}
