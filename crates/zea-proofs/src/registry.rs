//! Parameter registry and on-disk cache.
//!
//! Each circuit kind keeps its Groth16 artifacts under
//! `<dir>/<kind>/zk_pk` (the full proving parameters, verifying key
//! embedded) and `<dir>/<kind>/zk_vk` (the standalone verifying key).
//! Missing files trigger a one-time synthesis and trusted setup; later
//! runs load and reuse. The constraint system itself is re-synthesised
//! from code, so there is no separate artifact for it.
//!
//! The registry is read-only after initialisation and is shared by
//! reference across tasks.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bellman::groth16::{
    Parameters, PreparedVerifyingKey, VerifyingKey, generate_random_parameters,
    prepare_verifying_key,
};
use bls12_381::Bls12;
use rand::RngCore;
use tracing::info;
use zea_circuit::{AuctionCircuit, RegisterCircuit, TransferCircuit};

use crate::error::SetupError;
use crate::kind::CircuitKind;

const PK_FILE: &str = "zk_pk";
const VK_FILE: &str = "zk_vk";

/// Parameters and prepared verifying key for one circuit kind.
pub struct CircuitParams {
    /// The full Groth16 parameters used for proving.
    pub params: Parameters<Bls12>,
    /// The prepared verifying key used for verification.
    pub pvk: PreparedVerifyingKey<Bls12>,
}

/// Read-only registry of per-kind parameters.
pub struct ParamsRegistry {
    entries: HashMap<CircuitKind, CircuitParams>,
}

impl ParamsRegistry {
    /// Load the given kinds from `dir`, generating and caching any that
    /// are missing.
    ///
    /// # Errors
    /// Any I/O, decode or synthesis failure is fatal.
    pub fn load_or_generate(
        dir: &Path,
        kinds: &[CircuitKind],
        rng: &mut impl RngCore,
    ) -> Result<Self, SetupError> {
        let mut entries = HashMap::new();
        for kind in kinds {
            entries.insert(*kind, load_or_generate_kind(dir, *kind, rng)?);
        }
        Ok(Self { entries })
    }

    /// The parameters for a kind.
    ///
    /// # Errors
    /// Fails if the kind was not part of the loaded set.
    pub fn get(&self, kind: CircuitKind) -> Result<&CircuitParams, SetupError> {
        self.entries.get(&kind).ok_or(SetupError::MissingKind(kind))
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> SetupError + '_ {
    move |source| SetupError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn load_or_generate_kind(
    dir: &Path,
    kind: CircuitKind,
    rng: &mut impl RngCore,
) -> Result<CircuitParams, SetupError> {
    let kind_dir = dir.join(kind.dir_name());
    let pk_path = kind_dir.join(PK_FILE);
    let vk_path = kind_dir.join(VK_FILE);

    if pk_path.exists() && vk_path.exists() {
        info!(kind = %kind, path = %kind_dir.display(), "loading circuit parameters from disk");
        load_kind(&pk_path, &vk_path)
    } else {
        info!(kind = %kind, path = %kind_dir.display(), "generating circuit parameters");
        let params = generate_kind(kind, rng)?;
        write_kind(&kind_dir, &pk_path, &vk_path, &params)?;
        let pvk = prepare_verifying_key(&params.vk);
        Ok(CircuitParams { params, pvk })
    }
}

fn load_kind(pk_path: &Path, vk_path: &Path) -> Result<CircuitParams, SetupError> {
    let pk_file = fs::File::open(pk_path).map_err(io_err(pk_path))?;
    // These files are produced locally by this node; skip the subgroup
    // re-checks on load.
    let params = Parameters::read(io::BufReader::new(pk_file), false).map_err(|source| {
        SetupError::Malformed {
            path: pk_path.to_path_buf(),
            source,
        }
    })?;

    let vk_file = fs::File::open(vk_path).map_err(io_err(vk_path))?;
    let vk = VerifyingKey::read(io::BufReader::new(vk_file)).map_err(|source| {
        SetupError::Malformed {
            path: vk_path.to_path_buf(),
            source,
        }
    })?;

    let pvk = prepare_verifying_key(&vk);
    Ok(CircuitParams { params, pvk })
}

fn generate_kind(
    kind: CircuitKind,
    rng: &mut impl RngCore,
) -> Result<Parameters<Bls12>, SetupError> {
    let params = match kind {
        CircuitKind::Transfer1 => {
            generate_random_parameters::<Bls12, _, _>(TransferCircuit::<1>::blank(), rng)?
        }
        CircuitKind::Transfer2 => {
            generate_random_parameters::<Bls12, _, _>(TransferCircuit::<2>::blank(), rng)?
        }
        CircuitKind::Transfer3 => {
            generate_random_parameters::<Bls12, _, _>(TransferCircuit::<3>::blank(), rng)?
        }
        CircuitKind::Register => {
            generate_random_parameters::<Bls12, _, _>(RegisterCircuit::blank(), rng)?
        }
        CircuitKind::Auction2 => {
            generate_random_parameters::<Bls12, _, _>(AuctionCircuit::<2>::blank(), rng)?
        }
        CircuitKind::Auction3 => {
            generate_random_parameters::<Bls12, _, _>(AuctionCircuit::<3>::blank(), rng)?
        }
    };
    Ok(params)
}

fn write_kind(
    kind_dir: &Path,
    pk_path: &PathBuf,
    vk_path: &PathBuf,
    params: &Parameters<Bls12>,
) -> Result<(), SetupError> {
    fs::create_dir_all(kind_dir).map_err(io_err(kind_dir))?;

    let mut pk_file = io::BufWriter::new(fs::File::create(pk_path).map_err(io_err(pk_path))?);
    params.write(&mut pk_file).map_err(io_err(pk_path))?;

    let mut vk_file = io::BufWriter::new(fs::File::create(vk_path).map_err(io_err(vk_path))?);
    params.vk.write(&mut vk_file).map_err(io_err(vk_path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "unit-test")]

    use rand_core::SeedableRng as _;
    use rand_xorshift::XorShiftRng;

    use super::*;

    #[test]
    fn generates_then_loads_register_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = XorShiftRng::from_seed([81_u8; 16]);

        let generated = ParamsRegistry::load_or_generate(
            dir.path(),
            &[CircuitKind::Register],
            &mut rng,
        )
        .unwrap();
        assert!(generated.get(CircuitKind::Register).is_ok());
        assert!(matches!(
            generated.get(CircuitKind::Transfer1),
            Err(SetupError::MissingKind(_))
        ));
        assert!(dir.path().join("register").join("zk_pk").exists());
        assert!(dir.path().join("register").join("zk_vk").exists());

        // Second run loads the cached files.
        let loaded = ParamsRegistry::load_or_generate(
            dir.path(),
            &[CircuitKind::Register],
            &mut rng,
        )
        .unwrap();
        let a = generated.get(CircuitKind::Register).unwrap();
        let b = loaded.get(CircuitKind::Register).unwrap();
        let mut vk_a = Vec::new();
        a.params.vk.write(&mut vk_a).unwrap();
        let mut vk_b = Vec::new();
        b.params.vk.write(&mut vk_b).unwrap();
        assert_eq!(vk_a, vk_b);
    }
}
