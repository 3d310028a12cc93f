//! Quantum-inspired perturbation states
//!
//! Each (particle, asset) pair carries an amplitude/phase pair that random-walks
//! every iteration. It is a noise generator layered onto the swarm update, not a
//! physical simulation.

use rand::Rng;
use std::f64::consts::{PI, TAU};

/// Complex amplitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amplitude {
    pub real: f64,
    pub imaginary: f64,
}

impl Amplitude {
    pub fn magnitude(&self) -> f64 {
        (self.real * self.real + self.imaginary * self.imaginary).sqrt()
    }

    /// Rotate by `angle` radians
    fn rotated(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            real: cos * self.real - sin * self.imaginary,
            imaginary: sin * self.real + cos * self.imaginary,
        }
    }
}

/// Perturbation state for one particle dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantumState {
    pub amplitude: Amplitude,
    /// Radians in [0, 2π)
    pub phase: f64,
}

impl QuantumState {
    pub fn new(real: f64, imaginary: f64, phase: f64) -> Self {
        Self {
            amplitude: Amplitude { real, imaginary },
            phase: phase.rem_euclid(TAU),
        }
    }

    /// Amplitude components uniform in [0, 1), phase uniform in [0, 2π)
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            amplitude: Amplitude {
                real: rng.random::<f64>(),
                imaginary: rng.random::<f64>(),
            },
            phase: rng.random_range(0.0..TAU),
        }
    }

    /// Advance the phase by a U[0, π) step and rotate the amplitude by the new phase
    pub fn evolve<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let increment = rng.random_range(0.0..PI);
        self.evolve_by(increment);
    }

    pub(crate) fn evolve_by(&mut self, increment: f64) {
        self.phase = (self.phase + increment).rem_euclid(TAU);
        self.amplitude = self.amplitude.rotated(self.phase);
    }

    /// Position perturbation contributed to this dimension
    pub fn influence(&self) -> f64 {
        self.amplitude.magnitude() * self.phase.cos()
    }

    pub fn coherence(&self) -> f64 {
        self.amplitude.magnitude()
    }
}

/// Quantum states for a whole swarm, one row per particle
#[derive(Debug, Clone, PartialEq)]
pub struct QuantumGrid {
    pub(crate) rows: Vec<Vec<QuantumState>>,
}

impl QuantumGrid {
    pub fn random<R: Rng + ?Sized>(particles: usize, dimensions: usize, rng: &mut R) -> Self {
        let rows = (0..particles)
            .map(|_| (0..dimensions).map(|_| QuantumState::random(rng)).collect())
            .collect();
        Self { rows }
    }

    /// Mean over particles of the mean amplitude magnitude across dimensions
    pub fn average_coherence(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .rows
            .iter()
            .map(|row| {
                if row.is_empty() {
                    0.0
                } else {
                    row.iter().map(QuantumState::coherence).sum::<f64>() / row.len() as f64
                }
            })
            .sum();
        total / self.rows.len() as f64
    }
}
