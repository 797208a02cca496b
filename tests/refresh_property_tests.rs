//! Property-based tests for refresh credential rotation.
//!
//! Property 1: Rotation Invalidation
//! Property 2: Expiry Rejection
//! Property 3: Origin Anomaly Detection
//! Property 4: Credential Uniqueness

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use session_service::clock::ManualClock;
use session_service::refresh::{Fingerprinter, RefreshCredential, RefreshRotator};
use session_service::storage::MemoryFingerprintStore;
use session_service::SessionError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const REFRESH_TTL_SECS: u64 = 86_400;

/// Generate arbitrary subjects.
fn arb_subject() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,32}"
}

/// Generate arbitrary IPv4 origins.
fn arb_origin() -> impl Strategy<Value = String> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"))
}

fn create_test_rotator() -> (RefreshRotator, Arc<ManualClock>, Arc<MemoryFingerprintStore>) {
    let store = Arc::new(MemoryFingerprintStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
    ));
    let rotator = RefreshRotator::new(
        store.clone(),
        Arc::new(Fingerprinter::new(b"property-test-salt", 5).unwrap()),
        clock.clone(),
        Duration::from_secs(REFRESH_TTL_SECS),
        Duration::from_secs(2),
    );
    (rotator, clock, store)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property 1: Rotation Invalidation
    ///
    /// Along a chain of rotations only the newest credential redeems;
    /// every earlier one is rejected.
    #[test]
    fn prop_rotation_invalidates_previous(
        subject in arb_subject(),
        origin in arb_origin(),
        rotations in 1usize..6,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (rotator, _clock, store) = create_test_rotator();

            let first = rotator.issue_new(&subject, &origin).await.unwrap();
            let mut spent = Vec::new();
            let mut current = first.credential.encode();

            for _ in 0..rotations {
                let redemption = rotator.redeem(&current, &origin).await.unwrap();
                prop_assert_eq!(&redemption.subject, &subject);
                spent.push(current);
                current = redemption.issued.credential.encode();
            }

            for old in &spent {
                let result = rotator.redeem(old, &origin).await;
                prop_assert!(matches!(result, Err(SessionError::InvalidRefreshToken)));
            }

            // exactly one live credential in the chain
            prop_assert_eq!(store.len().await, 1);
            prop_assert!(rotator.redeem(&current, &origin).await.is_ok());
            Ok(())
        })?;
    }

    /// Property 2: Expiry Rejection
    ///
    /// A credential redeems strictly before its expiry and never after.
    #[test]
    fn prop_expiry_boundary(
        subject in arb_subject(),
        origin in arb_origin(),
        elapsed in 0u64..(REFRESH_TTL_SECS * 2),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (rotator, clock, _store) = create_test_rotator();

            let issued = rotator.issue_new(&subject, &origin).await.unwrap();
            clock.advance(chrono::Duration::seconds(elapsed as i64));

            let result = rotator.redeem(&issued.credential.encode(), &origin).await;
            if elapsed < REFRESH_TTL_SECS {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(SessionError::InvalidRefreshToken)));
            }
            Ok(())
        })?;
    }

    /// Property 3: Origin Anomaly Detection
    ///
    /// The anomaly flag is set exactly when the redeeming origin differs
    /// from the issuing one, and the replacement is bound to the new origin.
    #[test]
    fn prop_anomaly_iff_origin_differs(
        subject in arb_subject(),
        issued_from in arb_origin(),
        redeemed_from in arb_origin(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (rotator, _clock, _store) = create_test_rotator();

            let issued = rotator.issue_new(&subject, &issued_from).await.unwrap();
            let redemption = rotator
                .redeem(&issued.credential.encode(), &redeemed_from)
                .await
                .unwrap();

            prop_assert_eq!(redemption.anomaly, issued_from != redeemed_from);
            prop_assert_eq!(&redemption.previous_origin, &issued_from);

            let next = rotator
                .redeem(&redemption.issued.credential.encode(), &redeemed_from)
                .await
                .unwrap();
            prop_assert!(!next.anomaly);
            Ok(())
        })?;
    }

    /// Unknown credentials never redeem, whatever their bytes.
    #[test]
    fn prop_unknown_credential_rejected(bytes in prop::array::uniform32(any::<u8>())) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (rotator, _clock, _store) = create_test_rotator();
            rotator.issue_new("someone", "1.2.3.4").await.unwrap();

            let raw = base64_url(&bytes);
            prop_assert!(RefreshCredential::decode(&raw).is_some());
            let result = rotator.redeem(&raw, "1.2.3.4").await;
            prop_assert!(matches!(result, Err(SessionError::InvalidRefreshToken)));
            Ok(())
        })?;
    }

    /// Arbitrary text never panics and never redeems.
    #[test]
    fn prop_garbage_rejected(raw in ".{0,80}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (rotator, _clock, _store) = create_test_rotator();
            let result = rotator.redeem(&raw, "1.2.3.4").await;
            prop_assert!(matches!(result, Err(SessionError::InvalidRefreshToken)));
            Ok(())
        })?;
    }
}

/// Property 4: Credential Uniqueness
#[test]
fn test_generated_credentials_unique() {
    let encoded: HashSet<String> = (0..1000)
        .map(|_| RefreshCredential::generate().encode())
        .collect();
    assert_eq!(encoded.len(), 1000);
}

fn base64_url(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
