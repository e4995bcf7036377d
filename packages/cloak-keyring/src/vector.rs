use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::KeyMaterial;

const ROTATION_ROUNDS: usize = 2;

/// Keyed orthonormal transform: a secret permutation, per-axis sign flips,
/// and a run of Givens rotations, all drawn from a ChaCha20 stream seeded by
/// the session's vector seed. Orthonormality means dot products and norms
/// carry over to the encrypted space, so the backend can rank by cosine
/// similarity without ever holding a plaintext embedding.
struct Transform {
	permutation: Vec<usize>,
	signs: Vec<f32>,
	rotations: Vec<(usize, usize, f32)>,
}

fn transform_for(key: &KeyMaterial, dimensions: usize) -> Transform {
	// The dimension feeds the seed so differently sized embedding spaces get
	// unrelated transforms under the same session key.
	let seed = blake3::keyed_hash(&key.vector_seed, &(dimensions as u64).to_le_bytes());
	let mut rng = ChaCha20Rng::from_seed(*seed.as_bytes());
	let mut permutation: Vec<usize> = (0..dimensions).collect();

	for i in (1..dimensions).rev() {
		let j = rng.gen_range(0..=i);

		permutation.swap(i, j);
	}

	let signs: Vec<f32> =
		(0..dimensions).map(|_| if rng.r#gen::<bool>() { 1.0 } else { -1.0 }).collect();
	let mut rotations = Vec::with_capacity(ROTATION_ROUNDS * dimensions);

	for _ in 0..ROTATION_ROUNDS {
		for _ in 0..dimensions {
			let a = rng.gen_range(0..dimensions);
			let b = rng.gen_range(0..dimensions);

			if a == b {
				continue;
			}

			rotations.push((a, b, rng.r#gen::<f32>() * std::f32::consts::TAU));
		}
	}

	Transform { permutation, signs, rotations }
}

fn rotate(values: &mut [f32], a: usize, b: usize, angle: f32) {
	let (sin, cos) = angle.sin_cos();
	let x = values[a];
	let y = values[b];

	values[a] = cos * x - sin * y;
	values[b] = sin * x + cos * y;
}

pub fn encrypt_vector(key: &KeyMaterial, vector: &[f32]) -> Vec<f32> {
	if vector.is_empty() {
		return Vec::new();
	}

	let transform = transform_for(key, vector.len());
	let mut out: Vec<f32> =
		transform.permutation.iter().map(|&source| vector[source]).collect();

	for (value, sign) in out.iter_mut().zip(&transform.signs) {
		*value *= sign;
	}
	for &(a, b, angle) in &transform.rotations {
		rotate(&mut out, a, b, angle);
	}

	out
}

/// Exact inverse of [`encrypt_vector`] up to `f32` rounding.
pub fn decrypt_vector(key: &KeyMaterial, vector: &[f32]) -> Vec<f32> {
	if vector.is_empty() {
		return Vec::new();
	}

	let transform = transform_for(key, vector.len());
	let mut work = vector.to_vec();

	for &(a, b, angle) in transform.rotations.iter().rev() {
		rotate(&mut work, a, b, -angle);
	}
	for (value, sign) in work.iter_mut().zip(&transform.signs) {
		*value *= sign;
	}

	let mut out = vec![0.0; work.len()];

	for (target, &source) in transform.permutation.iter().enumerate() {
		out[source] = work[target];
	}

	out
}
