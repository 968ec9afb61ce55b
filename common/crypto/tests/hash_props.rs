use common_crypto::{CredentialHasher, HashingConfig};
use once_cell::sync::Lazy;
use proptest::prelude::*;

static HASHER: Lazy<CredentialHasher> =
    Lazy::new(|| CredentialHasher::new(&HashingConfig::new(1)).unwrap());

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn hash_then_verify_round_trips(plaintext in "\\PC{0,64}") {
        let digest = HASHER.hash(&plaintext).unwrap();
        prop_assert!(HASHER.verify(&plaintext, &digest));
    }

    #[test]
    fn other_plaintext_does_not_verify(a in "\\PC{1,32}", b in "\\PC{1,32}") {
        prop_assume!(a != b);
        let digest = HASHER.hash(&b).unwrap();
        prop_assert!(!HASHER.verify(&a, &digest));
    }
}
