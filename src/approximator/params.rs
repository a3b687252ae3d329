use super::Mode;
use byteorder::LittleEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;
use rand::Rng;
use rand::rngs::SmallRng;
use std::io::Cursor;

const MAGIC: &[u8; 4] = b"CRLB";
const VERSION: u16 = 1;

/// dense fully-connected parameters: ReLU hidden layers, linear
/// output. weights[l] is dims[l+1] x dims[l] row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub dims: Vec<usize>,
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<Vec<f32>>,
}

impl Params {
    pub fn zeros(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
            weights: dims
                .windows(2)
                .map(|w| vec![0.0; w[0] * w[1]])
                .collect(),
            biases: dims.iter().skip(1).map(|&n| vec![0.0; n]).collect(),
        }
    }

    /// He-style init scaled by fan-in, biases zero
    pub fn random(dims: &[usize], rng: &mut SmallRng) -> Self {
        let mut params = Self::zeros(dims);
        for (layer, window) in dims.windows(2).enumerate() {
            let scale = (2.0 / window[0] as f32).sqrt();
            for weight in params.weights[layer].iter_mut() {
                *weight = (rng.random::<f32>() * 2.0 - 1.0) * scale;
            }
        }
        params
    }

    pub fn layers(&self) -> usize {
        self.dims.len() - 1
    }

    /// forward pass returning only the output layer
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.activations(input)
            .pop()
            .expect("network has at least one layer")
    }

    /// forward pass keeping every layer's post-activation output,
    /// input included as layer zero. needed for backprop.
    pub fn activations(&self, input: &[f32]) -> Vec<Vec<f32>> {
        assert_eq!(input.len(), self.dims[0]);
        let mut outputs = vec![input.to_vec()];
        for layer in 0..self.layers() {
            let (n_in, n_out) = (self.dims[layer], self.dims[layer + 1]);
            let last = layer == self.layers() - 1;
            let previous = outputs.last().expect("layer zero present");
            let mut next = self.biases[layer].clone();
            for (row, out) in next.iter_mut().enumerate() {
                let weights = &self.weights[layer][row * n_in..(row + 1) * n_in];
                *out += weights
                    .iter()
                    .zip(previous.iter())
                    .map(|(w, x)| w * x)
                    .sum::<f32>();
                if !last && *out < 0.0 {
                    *out = 0.0;
                }
            }
            debug_assert_eq!(next.len(), n_out);
            outputs.push(next);
        }
        outputs
    }

    pub fn to_blob(&self, mode: Mode) -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(MAGIC);
        blob.write_u16::<LittleEndian>(VERSION).expect("vec write");
        blob.push(match mode {
            Mode::Value => 0,
            Mode::Policy => 1,
        });
        blob.push(self.dims.len() as u8);
        for &dim in self.dims.iter() {
            blob.write_u32::<LittleEndian>(dim as u32).expect("vec write");
        }
        for layer in self.weights.iter().chain(self.biases.iter()) {
            for &value in layer.iter() {
                blob.write_f32::<LittleEndian>(value).expect("vec write");
            }
        }
        blob
    }

    pub fn from_blob(blob: &[u8]) -> Result<(Mode, Self), String> {
        let mut cursor = Cursor::new(blob);
        let mut magic = [0u8; 4];
        std::io::Read::read_exact(&mut cursor, &mut magic).map_err(|e| e.to_string())?;
        if &magic != MAGIC {
            return Err("bad magic bytes".to_string());
        }
        let version = cursor.read_u16::<LittleEndian>().map_err(|e| e.to_string())?;
        if version != VERSION {
            return Err(format!("unsupported blob version {}", version));
        }
        let mode = match cursor.read_u8().map_err(|e| e.to_string())? {
            0 => Mode::Value,
            1 => Mode::Policy,
            other => return Err(format!("unknown mode tag {}", other)),
        };
        let n_dims = cursor.read_u8().map_err(|e| e.to_string())? as usize;
        if n_dims < 2 {
            return Err("blob needs at least two layer dims".to_string());
        }
        let mut dims = Vec::with_capacity(n_dims);
        for _ in 0..n_dims {
            dims.push(cursor.read_u32::<LittleEndian>().map_err(|e| e.to_string())? as usize);
        }
        let mut params = Self::zeros(&dims);
        for layer in params.weights.iter_mut().chain(params.biases.iter_mut()) {
            for value in layer.iter_mut() {
                *value = cursor.read_f32::<LittleEndian>().map_err(|e| e.to_string())?;
            }
        }
        if cursor.position() != blob.len() as u64 {
            return Err("trailing bytes in parameter blob".to_string());
        }
        Ok((mode, params))
    }

    /// elementwise visitation over every trainable value
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut f32)) {
        for layer in self.weights.iter_mut().chain(self.biases.iter_mut()) {
            for value in layer.iter_mut() {
                f(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn blob_round_trip_preserves_forward() {
        let mut rng = SmallRng::seed_from_u64(7);
        let params = Params::random(&[8, 16, 4], &mut rng);
        let blob = params.to_blob(Mode::Value);
        let (mode, restored) = Params::from_blob(&blob).unwrap();
        assert_eq!(mode, Mode::Value);
        assert_eq!(restored, params);
        let probe = (0..8).map(|i| i as f32 / 8.0).collect::<Vec<_>>();
        assert_eq!(params.forward(&probe), restored.forward(&probe));
    }

    #[test]
    fn corrupt_blobs_are_rejected(){
        let mut rng = SmallRng::seed_from_u64(7);
        let params = Params::random(&[4, 4], &mut rng);
        let mut blob = params.to_blob(Mode::Policy);
        blob[0] = b'X';
        assert!(Params::from_blob(&blob).is_err());
        let blob = params.to_blob(Mode::Policy);
        assert!(Params::from_blob(&blob[..blob.len() - 2]).is_err());
    }

    #[test]
    fn relu_hidden_linear_output() {
        let mut params = Params::zeros(&[2, 2, 2]);
        // first layer maps to (-1, 1); relu keeps only the second
        params.weights[0] = vec![-1.0, 0.0, 1.0, 0.0];
        params.weights[1] = vec![1.0, 1.0, 0.0, -1.0];
        let out = params.forward(&[1.0, 0.0]);
        assert_eq!(out, vec![1.0, -1.0]);
    }
}
