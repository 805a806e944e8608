//! Trusted setup and test vector generator for the Murmur protocol.
//!
//! Runs the Groth16 setup of the signal circuit for one tree depth and
//! writes the key files next to `test_vectors.json`, the reference values
//! other implementations check their hashing against.
//!
//! Usage:
//!   murmur-keygen [--depth N] [--out DIR]   # Keys + test_vectors.json
//!   murmur-keygen --vectors-only [--out DIR]
//!   murmur-keygen --verify [--out DIR]      # Check DIR/test_vectors.json

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use murmur_crypto::{poseidon, Fr};
use murmur_identity::derive_identity;
use murmur_nullifier::derive_nullifier_hash;
use murmur_registry::{zero_hashes, MembershipTree};
use murmur_signal::{ExternalNullifier, SignalKeys};
use murmur_types::DEFAULT_TREE_DEPTH;
use serde::{Deserialize, Serialize};
use tracing::info;

const VECTORS_FILE: &str = "test_vectors.json";

#[derive(Serialize, Deserialize)]
struct TestVectors {
    version: String,
    generated_by: String,
    vectors: BTreeMap<String, TestVector>,
}

#[derive(Serialize, Deserialize)]
struct TestVector {
    description: String,
    inputs: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    depth: usize,
    out: PathBuf,
    verify: bool,
    vectors_only: bool,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut parsed = Args {
        depth: DEFAULT_TREE_DEPTH,
        out: PathBuf::from("keys"),
        verify: false,
        vectors_only: false,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--depth" => {
                let value = iter.next().context("--depth needs a value")?;
                parsed.depth = value
                    .parse()
                    .with_context(|| format!("invalid depth {value:?}"))?;
            }
            "--out" => {
                parsed.out = PathBuf::from(iter.next().context("--out needs a directory")?);
            }
            "--verify" => parsed.verify = true,
            "--vectors-only" => parsed.vectors_only = true,
            other => bail!("unknown argument {other:?}"),
        }
    }
    if parsed.depth == 0 || parsed.depth > murmur_types::MAX_TREE_DEPTH {
        bail!("depth must be between 1 and 32, got {}", parsed.depth);
    }
    Ok(parsed)
}

fn vector(
    description: &str,
    inputs: &[(&str, String)],
    outputs: &[(&str, String)],
) -> TestVector {
    let map = |pairs: &[(&str, String)]| {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>()
    };
    TestVector {
        description: description.to_string(),
        inputs: map(inputs),
        outputs: map(outputs),
    }
}

fn generate_poseidon_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let h = poseidon::hash(Fr::from(1u64), Fr::from(2u64));
    vectors.insert(
        "poseidon_hash_1_2".to_string(),
        vector(
            "Poseidon(1, 2), width 3, R_F 8, R_P 57, alpha 5",
            &[("a", "1".into()), ("b", "2".into())],
            &[("hash", poseidon::to_decimal(&h))],
        ),
    );

    vectors
}

fn generate_identity_vectors() -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();
    let secret = "murmur test identity";
    let identity = derive_identity(secret.as_bytes())?;

    vectors.insert(
        "identity_derivation".to_string(),
        vector(
            "trapdoor/nullifier_secret = derive_key(ctx, secret) mod r; commitment = Poseidon(trapdoor, nullifier_secret)",
            &[("secret", secret.into())],
            &[
                ("trapdoor", poseidon::to_decimal(&identity.trapdoor())),
                ("nullifier_secret", poseidon::to_decimal(&identity.nullifier_secret())),
                ("commitment", poseidon::to_decimal(&identity.commitment())),
            ],
        ),
    );

    let round = ExternalNullifier::from_round(1);
    let nullifier_hash = derive_nullifier_hash(identity.nullifier_secret(), round.as_field());
    vectors.insert(
        "nullifier_hash_round_1".to_string(),
        vector(
            "nullifier_hash = Poseidon(nullifier_secret, external_nullifier) for round 1",
            &[
                ("nullifier_secret", poseidon::to_decimal(&identity.nullifier_secret())),
                ("external_nullifier", round.to_string()),
            ],
            &[("nullifier_hash", poseidon::to_hex(&nullifier_hash))],
        ),
    );

    let topic = "murmur";
    vectors.insert(
        "external_nullifier_topic".to_string(),
        vector(
            "external_nullifier = derive_key(\"Murmur v1 external-nullifier\", topic) with top byte cleared",
            &[("topic", topic.into())],
            &[("external_nullifier", ExternalNullifier::from_topic(topic).to_string())],
        ),
    );

    Ok(vectors)
}

fn generate_signal_vectors() -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();
    let text = "Hello World";
    let encoded = murmur_signal::encode_signal(text)?;
    vectors.insert(
        "signal_encoding".to_string(),
        vector(
            "Signal bytes left-aligned in a 32-byte zero-padded field, hashed with \"Murmur v1 signal-hash\"",
            &[("signal", text.into())],
            &[
                ("encoded", hex::encode(encoded)),
                ("signal_hash", poseidon::to_decimal(&murmur_signal::signal_hash(&encoded))),
            ],
        ),
    );
    Ok(vectors)
}

fn generate_tree_vectors(depth: usize) -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();

    let zeros = zero_hashes(depth);
    let empty_root = zeros.last().copied().unwrap_or_default();
    vectors.insert(
        format!("empty_tree_root_depth_{depth}"),
        vector(
            "Root of a tree of zero leaves: zeros[i + 1] = Poseidon(zeros[i], zeros[i])",
            &[("depth", depth.to_string())],
            &[("root", poseidon::to_hex(&empty_root))],
        ),
    );

    let leaves: Vec<Fr> = (1..=3u64).map(Fr::from).collect();
    let tree = MembershipTree::from_commitments(2, &leaves)?;
    let proof = tree.proof_at(1)?;
    vectors.insert(
        "tree_three_leaves_depth_2".to_string(),
        vector(
            "Tree [1, 2, 3] at depth 2; inclusion path of leaf 1",
            &[("leaves", "1,2,3".into()), ("depth", "2".into())],
            &[
                ("root", poseidon::to_hex(&tree.root())),
                (
                    "siblings",
                    proof
                        .sibling_hashes()
                        .iter()
                        .map(poseidon::to_hex)
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                (
                    "path_bits",
                    proof
                        .path_bits()
                        .iter()
                        .map(|b| if *b { "1" } else { "0" })
                        .collect::<Vec<_>>()
                        .join(","),
                ),
            ],
        ),
    );

    Ok(vectors)
}

fn generate_all_vectors(depth: usize) -> anyhow::Result<TestVectors> {
    let mut all_vectors = BTreeMap::new();

    all_vectors.extend(generate_poseidon_vectors());
    all_vectors.extend(generate_identity_vectors()?);
    all_vectors.extend(generate_signal_vectors()?);
    all_vectors.extend(generate_tree_vectors(depth)?);

    Ok(TestVectors {
        version: "1.0".to_string(),
        generated_by: "murmur-keygen".to_string(),
        vectors: all_vectors,
    })
}

/// Names of vectors whose outputs differ from a fresh regeneration.
fn verify_vectors(vectors: &TestVectors, depth: usize) -> anyhow::Result<Vec<String>> {
    let regenerated = generate_all_vectors(depth)?;
    let mut failures = Vec::new();

    for (name, expected) in &vectors.vectors {
        match regenerated.vectors.get(name) {
            Some(actual) if actual.outputs == expected.outputs => {
                info!(vector = %name, "PASS");
            }
            Some(actual) => {
                tracing::error!(
                    vector = %name,
                    expected = ?expected.outputs,
                    actual = ?actual.outputs,
                    "FAIL"
                );
                failures.push(name.clone());
            }
            None => {
                tracing::error!(vector = %name, "MISSING");
                failures.push(name.clone());
            }
        }
    }

    Ok(failures)
}

/// Depth recorded by an `empty_tree_root_depth_<N>` entry, if any.
fn recorded_depth(vectors: &TestVectors) -> Option<usize> {
    vectors
        .vectors
        .keys()
        .find_map(|name| name.strip_prefix("empty_tree_root_depth_")?.parse().ok())
}

fn write_vectors(out: &Path, depth: usize) -> anyhow::Result<()> {
    let vectors = generate_all_vectors(depth)?;
    let path = out.join(VECTORS_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(&vectors)?)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(count = vectors.vectors.len(), path = %path.display(), "test vectors written");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("murmur=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&args)?;

    if args.verify {
        let path = args.out.join(VECTORS_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let vectors: TestVectors = serde_json::from_str(&content)?;
        let depth = recorded_depth(&vectors).unwrap_or(args.depth);
        let failures = verify_vectors(&vectors, depth)?;
        if !failures.is_empty() {
            bail!("{} test vector(s) failed: {}", failures.len(), failures.join(", "));
        }
        info!("all test vectors verified");
        return Ok(());
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    if !args.vectors_only {
        info!(depth = args.depth, "running signal circuit setup");
        let keys = SignalKeys::setup(args.depth)?;
        keys.save(&args.out)?;
    }
    write_vectors(&args.out, args.depth)?;
    Ok(())
}
