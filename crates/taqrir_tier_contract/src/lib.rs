use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub const CONTRACT_ID: &str = "taqrir.tier_contract";
pub const CONTRACT_VERSION: &str = "1";

const TIER_BANDS_REGISTRY_ID: &str = "taqrir.tier_bands.v1";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierBandDef {
    pub id: &'static str,
    pub label_ar: &'static str,
    pub lower: f64,
    pub upper: f64,
    pub upper_inclusive: bool,
    pub color_rgb: [u8; 3],
}

pub const TIER_BANDS_V1: [TierBandDef; 3] = [
    TierBandDef {
        id: "basic",
        label_ar: "أساسي",
        lower: 0.0,
        upper: 50.0,
        upper_inclusive: false,
        color_rgb: [192, 57, 43],
    },
    TierBandDef {
        id: "emerging",
        label_ar: "ناشئ",
        lower: 50.0,
        upper: 75.0,
        upper_inclusive: false,
        color_rgb: [230, 126, 34],
    },
    TierBandDef {
        id: "ideal",
        label_ar: "مثالي",
        lower: 75.0,
        upper: 100.0,
        upper_inclusive: true,
        color_rgb: [39, 174, 96],
    },
];

// Runtime authority is compiled into the binary. The payload is frozen at
// compile time; runtime never reads band definitions from repo files.
const TIER_BANDS_V1_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/contract/tier_bands.v1.json"
));

#[derive(Debug, Clone)]
pub struct TierContractMetadata {
    pub contract_id: &'static str,
    pub contract_version: &'static str,
    pub contract_fingerprint_sha256: String,
    pub tier_bands_registry_id: &'static str,
    pub tier_bands_registry_hash_sha256: String,
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn hash_memoized(cell: &OnceLock<String>, text: &str) -> String {
    cell.get_or_init(|| hex_sha256(text.as_bytes())).clone()
}

static TIER_BANDS_HASH: OnceLock<String> = OnceLock::new();
static CONTRACT_FINGERPRINT: OnceLock<String> = OnceLock::new();

pub fn tier_bands_v1_json() -> &'static str {
    TIER_BANDS_V1_JSON
}

pub fn tier_bands_v1_hash_sha256() -> String {
    hash_memoized(&TIER_BANDS_HASH, TIER_BANDS_V1_JSON)
}

pub fn contract_fingerprint_sha256() -> String {
    CONTRACT_FINGERPRINT
        .get_or_init(|| {
            let mut hasher = Sha256::new();
            hasher.update(CONTRACT_ID.as_bytes());
            hasher.update(b"\n");
            hasher.update(CONTRACT_VERSION.as_bytes());
            hasher.update(b"\n");
            hasher.update(TIER_BANDS_REGISTRY_ID.as_bytes());
            hasher.update(b"\n");
            hasher.update(tier_bands_v1_hash_sha256().as_bytes());
            let digest = hasher.finalize();
            let mut out = String::with_capacity(digest.len() * 2);
            for b in digest {
                use std::fmt::Write;
                let _ = write!(&mut out, "{:02x}", b);
            }
            out
        })
        .clone()
}

pub fn registry_json(name: &str) -> Option<&'static str> {
    match name {
        TIER_BANDS_REGISTRY_ID => Some(TIER_BANDS_V1_JSON),
        _ => None,
    }
}

pub fn tier_band_defs_v1() -> &'static [TierBandDef] {
    &TIER_BANDS_V1
}

pub fn tier_band_def(band_id: &str) -> Option<&'static TierBandDef> {
    TIER_BANDS_V1.iter().find(|d| d.id == band_id)
}

/// Pure mapping from an unrounded percentage to its band. Values below the
/// scale clamp to the first band, values above it to the last; display
/// rounding never feeds into this.
pub fn band_for(percentage: f64) -> &'static TierBandDef {
    if !percentage.is_finite() {
        return &TIER_BANDS_V1[0];
    }
    for band in &TIER_BANDS_V1 {
        let below_upper = if band.upper_inclusive {
            percentage <= band.upper
        } else {
            percentage < band.upper
        };
        if percentage >= band.lower && below_upper {
            return band;
        }
    }
    if percentage < TIER_BANDS_V1[0].lower {
        &TIER_BANDS_V1[0]
    } else {
        &TIER_BANDS_V1[TIER_BANDS_V1.len() - 1]
    }
}

pub fn metadata() -> TierContractMetadata {
    TierContractMetadata {
        contract_id: CONTRACT_ID,
        contract_version: CONTRACT_VERSION,
        contract_fingerprint_sha256: contract_fingerprint_sha256(),
        tier_bands_registry_id: TIER_BANDS_REGISTRY_ID,
        tier_bands_registry_hash_sha256: tier_bands_v1_hash_sha256(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_embedded_registry() -> Value {
        serde_json::from_str(TIER_BANDS_V1_JSON).expect("embedded tier band JSON should parse")
    }

    #[test]
    fn contract_fingerprint_is_stable_and_nonempty() {
        let a = contract_fingerprint_sha256();
        let b = contract_fingerprint_sha256();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn registry_lookup_returns_known_payload() {
        assert!(
            registry_json(TIER_BANDS_REGISTRY_ID)
                .unwrap()
                .contains("\"schema\": \"taqrir.tier_bands.v1\"")
        );
        assert!(registry_json("unknown").is_none());
    }

    #[test]
    fn bands_partition_the_scale_without_gaps_or_overlaps() {
        let bands = tier_band_defs_v1();
        assert_eq!(bands[0].lower, 0.0);
        for pair in bands.windows(2) {
            assert_eq!(pair[0].upper, pair[1].lower, "gap or overlap between bands");
            assert!(!pair[0].upper_inclusive, "interior band must be half-open");
        }
        let last = bands.last().unwrap();
        assert_eq!(last.upper, 100.0);
        assert!(last.upper_inclusive);
    }

    #[test]
    fn band_for_respects_half_open_boundaries() {
        assert_eq!(band_for(0.0).id, "basic");
        assert_eq!(band_for(49.6).id, "basic");
        assert_eq!(band_for(49.999).id, "basic");
        assert_eq!(band_for(50.0).id, "emerging");
        assert_eq!(band_for(74.9).id, "emerging");
        assert_eq!(band_for(75.0).id, "ideal");
        assert_eq!(band_for(82.0).id, "ideal");
        assert_eq!(band_for(100.0).id, "ideal");
    }

    #[test]
    fn band_for_clamps_out_of_scale_values() {
        assert_eq!(band_for(-3.0).id, "basic");
        assert_eq!(band_for(104.2).id, "ideal");
        assert_eq!(band_for(f64::NAN).id, "basic");
    }

    #[test]
    fn exports_match_embedded_registry() {
        let root = parse_embedded_registry();
        assert_eq!(
            root.get("schema").and_then(Value::as_str),
            Some(TIER_BANDS_REGISTRY_ID)
        );

        let bands_json = root
            .get("bands")
            .and_then(Value::as_array)
            .expect("bands array");
        assert_eq!(tier_band_defs_v1().len(), bands_json.len());

        for (idx, band) in bands_json.iter().enumerate() {
            let expected = &tier_band_defs_v1()[idx];
            assert_eq!(band.get("id").and_then(Value::as_str), Some(expected.id));
            assert_eq!(
                band.get("label_ar").and_then(Value::as_str),
                Some(expected.label_ar)
            );
            let lower = band.get("lower").and_then(Value::as_f64).expect("lower");
            let upper = band.get("upper").and_then(Value::as_f64).expect("upper");
            assert!((lower - expected.lower).abs() < f64::EPSILON, "lower drift for {}", expected.id);
            assert!((upper - expected.upper).abs() < f64::EPSILON, "upper drift for {}", expected.id);
            assert_eq!(
                band.get("upper_inclusive").and_then(Value::as_bool),
                Some(expected.upper_inclusive),
                "bound drift for {}",
                expected.id
            );
            let color: Vec<u64> = band
                .get("color_rgb")
                .and_then(Value::as_array)
                .expect("color_rgb array")
                .iter()
                .filter_map(Value::as_u64)
                .collect();
            assert_eq!(
                color,
                expected.color_rgb.iter().map(|&c| c as u64).collect::<Vec<_>>(),
                "color drift for {}",
                expected.id
            );
        }

        let scale = root.get("scale").and_then(Value::as_object).expect("scale");
        assert_eq!(scale.get("min").and_then(Value::as_f64), Some(0.0));
        assert_eq!(scale.get("max").and_then(Value::as_f64), Some(100.0));
    }
}
