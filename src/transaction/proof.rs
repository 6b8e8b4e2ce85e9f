//! Zero-knowledge proofs embedded in transactions.
//!
//! - [`RangeProof`]: every output amount lies in `[0, 2^64)`. Each output
//!   commitment is split into 64 bit commitments, each carrying a one-of-two
//!   Schnorr proof (Cramer-Damgard-Schoenmakers) that it commits to 0 or 1.
//!   All bits of all outputs share a single Fiat-Shamir challenge.
//! - [`BalanceProof`]: knowledge of `x` with `sum(C_in) - sum(C_out) - fee*B = x*g`,
//!   which exists only when the committed amounts balance.

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::primitives::{generator_g, Point, Scalar, Transcript};
use crate::{Error, Result};

/// Bits per range-proved amount.
pub const RANGE_BITS: usize = 64;

const RANGE_DOMAIN: &[u8] = b"range-proof";
const BALANCE_DOMAIN: &[u8] = b"balance-proof";

/// Public statement of one range-proved output.
#[derive(Clone, Copy, Debug)]
pub struct RangeStatement {
    /// Output commitment `value * base + blinding * g`.
    pub commitment: Point,
    /// Base the value is committed to.
    pub base: Point,
}

/// Secret opening of a range-proved output.
#[derive(Clone, Copy, Debug)]
pub struct RangeWitness {
    pub value: u64,
    pub blinding: Scalar,
}

/// Proof that a bit commitment opens to 0 or 1.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BitProof {
    pub commitment: Point,
    /// Challenge share of the zero branch; the one branch gets `e - e0`.
    pub e0: Scalar,
    pub z0: Scalar,
    pub z1: Scalar,
}

/// Aggregated range proof over all outputs of a transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RangeProof {
    pub challenge: Scalar,
    /// `RANGE_BITS` bit proofs per output, outputs in order.
    pub bits: Vec<BitProof>,
}

/// Prover-side state of one bit before the challenge is known.
struct PendingBit {
    bit: bool,
    blinding: Scalar,
    nonce: Scalar,
    simulated_challenge: Scalar,
    simulated_response: Scalar,
}

fn power_of_two(exponent: usize) -> Scalar {
    (0..exponent).fold(Scalar::ONE, |acc, _| acc + acc)
}

fn range_transcript(context: &[u8], statements: &[RangeStatement]) -> Transcript {
    let mut transcript = Transcript::new(RANGE_DOMAIN);
    transcript.append_context(context);
    transcript.append_u64(b"outputs", statements.len() as u64);
    for statement in statements {
        transcript.append_point(b"C", &statement.commitment);
        transcript.append_point(b"B", &statement.base);
    }
    transcript
}

fn append_bit(transcript: &mut Transcript, commitment: &Point, a0: &Point, a1: &Point) {
    transcript.append_point(b"Cj", commitment);
    transcript.append_point(b"A0", a0);
    transcript.append_point(b"A1", a1);
}

impl RangeProof {
    /// Proves that every `witnesses[i].value` fits in 64 bits.
    ///
    /// # Errors
    /// [`Error::ConstructionFailure`] if the statement and witness lists differ in length.
    pub fn prove<R: CryptoRngCore>(
        statements: &[RangeStatement],
        witnesses: &[RangeWitness],
        context: &[u8],
        rng: &mut R,
    ) -> Result<Self> {
        if statements.len() != witnesses.len() {
            return Err(Error::ConstructionFailure(
                "Range proof needs one witness per output".to_string(),
            ));
        }

        let g = generator_g();
        let top_inverse = power_of_two(RANGE_BITS - 1)
            .invert()
            .ok_or_else(|| Error::ConstructionFailure("Degenerate bit weight".to_string()))?;

        let mut transcript = range_transcript(context, statements);
        let blindings: Vec<&Scalar> = witnesses.iter().map(|w| &w.blinding).collect();
        let mut nonce_rng = transcript.witness_rng(&blindings, rng);

        let mut commitments = Vec::with_capacity(statements.len() * RANGE_BITS);
        let mut pending = Vec::with_capacity(statements.len() * RANGE_BITS);

        for (statement, witness) in statements.iter().zip(witnesses) {
            let mut weighted = Scalar::ZERO;
            for j in 0..RANGE_BITS {
                let bit = (witness.value >> j) & 1 == 1;
                // The top bit's blinding closes sum(2^j * r_j) = r.
                let blinding = if j + 1 == RANGE_BITS {
                    (witness.blinding - weighted) * top_inverse
                } else {
                    let r = Scalar::random(rng);
                    weighted = weighted + power_of_two(j) * r;
                    r
                };

                let mut commitment = Point::mul_base(&blinding);
                if bit {
                    commitment = commitment + statement.base;
                }

                let state = PendingBit {
                    bit,
                    blinding,
                    nonce: Scalar::random(&mut nonce_rng),
                    simulated_challenge: Scalar::random(&mut nonce_rng),
                    simulated_response: Scalar::random(&mut nonce_rng),
                };

                // Real branch commits k*g; the other branch is simulated as
                // z*g + e*Y for its statement Y.
                let real = Point::mul_base(&state.nonce);
                let simulated = |y: Point| {
                    g * state.simulated_response + y * state.simulated_challenge
                };
                let (a0, a1) = if bit {
                    (simulated(commitment), real)
                } else {
                    (real, simulated(commitment - statement.base))
                };

                append_bit(&mut transcript, &commitment, &a0, &a1);
                commitments.push(commitment);
                pending.push(state);
            }
        }

        let challenge = transcript.challenge_scalar(b"e");
        let bits = commitments
            .into_iter()
            .zip(pending)
            .map(|(commitment, state)| {
                let real_challenge = challenge - state.simulated_challenge;
                let real_response = state.nonce - real_challenge * state.blinding;
                if state.bit {
                    BitProof {
                        commitment,
                        e0: state.simulated_challenge,
                        z0: state.simulated_response,
                        z1: real_response,
                    }
                } else {
                    BitProof {
                        commitment,
                        e0: real_challenge,
                        z0: real_response,
                        z1: state.simulated_response,
                    }
                }
            })
            .collect();

        Ok(Self { challenge, bits })
    }

    /// Verifies the proof against the public output statements.
    pub fn verify(&self, statements: &[RangeStatement], context: &[u8]) -> bool {
        if self.bits.len() != statements.len() * RANGE_BITS {
            return false;
        }

        let g = generator_g();
        let mut transcript = range_transcript(context, statements);

        for (statement, bits) in statements.iter().zip(self.bits.chunks(RANGE_BITS)) {
            let mut recombined = Point::identity();
            for (j, proof) in bits.iter().enumerate() {
                let e1 = self.challenge - proof.e0;
                let a0 = g * proof.z0 + proof.commitment * proof.e0;
                let a1 = g * proof.z1 + (proof.commitment - statement.base) * e1;
                append_bit(&mut transcript, &proof.commitment, &a0, &a1);
                recombined = recombined + proof.commitment * power_of_two(j);
            }
            if recombined != statement.commitment {
                return false;
            }
        }

        transcript.challenge_scalar(b"e") == self.challenge
    }
}

/// Schnorr proof of knowledge of the discrete log of the balance excess.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BalanceProof {
    pub challenge: Scalar,
    pub response: Scalar,
}

/// Computes `sum(inputs) - sum(outputs) - fee * fee_base`.
pub fn balance_excess(inputs: &[Point], outputs: &[Point], fee: u64, fee_base: &Point) -> Point {
    let sum_in = crate::primitives::group::sum_points(inputs);
    let sum_out = crate::primitives::group::sum_points(outputs);
    sum_in - sum_out - *fee_base * Scalar::from(fee)
}

fn balance_transcript(context: &[u8], excess: &Point) -> Transcript {
    let mut transcript = Transcript::new(BALANCE_DOMAIN);
    transcript.append_context(context);
    transcript.append_point(b"E", excess);
    transcript
}

impl BalanceProof {
    /// Proves `excess = secret * g`.
    pub fn prove<R: CryptoRngCore>(
        excess: &Point,
        secret: &Scalar,
        context: &[u8],
        rng: &mut R,
    ) -> Result<Self> {
        if Point::mul_base(secret) != *excess {
            return Err(Error::ConstructionFailure(
                "Committed amounts do not balance".to_string(),
            ));
        }

        let mut transcript = balance_transcript(context, excess);
        let mut nonce_rng = transcript.witness_rng(&[secret], rng);
        let nonce = Scalar::random(&mut nonce_rng);
        transcript.append_point(b"A", &Point::mul_base(&nonce));
        let challenge = transcript.challenge_scalar(b"c");

        Ok(Self {
            challenge,
            response: nonce - challenge * *secret,
        })
    }

    pub fn verify(&self, excess: &Point, context: &[u8]) -> bool {
        let commitment = Point::mul_base(&self.response) + *excess * self.challenge;
        let mut transcript = balance_transcript(context, excess);
        transcript.append_point(b"A", &commitment);
        transcript.challenge_scalar(b"c") == self.challenge
    }
}
