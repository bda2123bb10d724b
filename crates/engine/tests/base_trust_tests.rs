mod common;

use common::Layout;
use vardr_engine as ve;
use ve::TrustStoreWriter;

#[test]
fn pem_bundle_starts_from_system_bundle() {
    let layout = Layout::new();
    let system = format!(
        "{}{}",
        common::generate_cert_pem("system-1"),
        common::generate_cert_pem("system-2")
    );
    let base = common::write_file(layout.root.path(), "ca-certificates.crt", system);
    layout.write_valid("corp.crt");

    let mut cfg = layout.config();
    cfg.base_trust = Some(base);
    let outcome = ve::reconcile_pem_bundle(cfg).unwrap();

    match &outcome.status {
        ve::ReconcileStatus::Rebuilt { summary, entries, base_entries } => {
            assert_eq!(*base_entries, 2);
            assert_eq!(*entries, 3);
            // Base entries are not part of the import summary.
            assert_eq!(summary.total_certificates, 1);
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(common::pem_cert_count(&layout.pem_bundle_file()), 3);
}

#[test]
fn keystore_starts_from_base_store() {
    let layout = Layout::new();
    let writer = ve::KeyStoreWriter::new(String::from("changeit").into());

    let mut jdk = ve::TrustMaterial::new();
    let pem = common::generate_cert_pem("jdk-root");
    jdk.insert("digicertrootca", vec![openssl::x509::X509::from_pem(pem.as_bytes()).unwrap()]);
    let base = common::write_file(layout.root.path(), "jdk-cacerts", writer.render(&jdk).unwrap());

    layout.write_valid("corp.crt");
    let mut cfg = layout.config();
    cfg.base_trust = Some(base);
    ve::reconcile_keystore(cfg).unwrap();

    assert_eq!(
        common::keystore_aliases(&layout.keystore_file()),
        vec!["base/digicertrootca", "corp"]
    );
}

#[test]
fn mounted_file_cannot_replace_a_base_entry() {
    let layout = Layout::new();
    let system = format!(
        "{}{}",
        common::generate_cert_pem("system-1"),
        common::generate_cert_pem("system-2")
    );
    let base = common::write_file(layout.root.path(), "ca-certificates.crt", system);
    // Same spelling a numbered base alias would have without its namespace.
    layout.write_valid("base-0000.crt");
    layout.write_valid("0000.crt");

    let mut cfg = layout.config();
    cfg.base_trust = Some(base);
    let outcome = ve::reconcile_pem_bundle(cfg).unwrap();

    match &outcome.status {
        ve::ReconcileStatus::Rebuilt { entries, base_entries, .. } => {
            assert_eq!(*base_entries, 2);
            assert_eq!(*entries, 4);
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(common::pem_cert_count(&layout.pem_bundle_file()), 4);
    let bundle = std::fs::read_to_string(layout.pem_bundle_file()).unwrap();
    for alias in ["# base/0000", "# base/0001", "# base-0000", "# 0000"] {
        assert!(bundle.lines().any(|l| l == alias), "missing {alias}");
    }
}

#[test]
fn keystore_base_aliases_are_namespaced() {
    let layout = Layout::new();
    let writer = ve::KeyStoreWriter::new(String::from("changeit").into());

    let mut jdk = ve::TrustMaterial::new();
    let pem = common::generate_cert_pem("jdk-root");
    jdk.insert("corp", vec![openssl::x509::X509::from_pem(pem.as_bytes()).unwrap()]);
    let base = common::write_file(layout.root.path(), "jdk-cacerts", writer.render(&jdk).unwrap());

    layout.write_valid("corp.crt");
    let mut cfg = layout.config();
    cfg.base_trust = Some(base);
    ve::reconcile_keystore(cfg).unwrap();

    // The mounted corp.crt sits next to the JDK entry of the same name.
    assert_eq!(
        common::keystore_aliases(&layout.keystore_file()),
        vec!["base/corp", "corp"]
    );
}

#[test]
fn unreadable_base_is_skipped() {
    let layout = Layout::new();
    layout.write_valid("corp.crt");

    let mut cfg = layout.config();
    cfg.base_trust = Some(layout.root.path().join("does-not-exist.pem"));
    let outcome = ve::reconcile_pem_bundle(cfg).unwrap();
    assert_eq!(outcome.summary().unwrap().successful_imports, 1);
    assert_eq!(common::pem_cert_count(&layout.pem_bundle_file()), 1);
}

#[test]
fn base_store_with_wrong_password_is_skipped() {
    let layout = Layout::new();
    let other = ve::KeyStoreWriter::new(String::from("not-changeit").into());
    let mut jdk = ve::TrustMaterial::new();
    let pem = common::generate_cert_pem("jdk-root");
    jdk.insert("root", vec![openssl::x509::X509::from_pem(pem.as_bytes()).unwrap()]);
    let base = common::write_file(layout.root.path(), "jdk-cacerts", other.render(&jdk).unwrap());

    let mut cfg = layout.config();
    cfg.base_trust = Some(base);
    ve::reconcile_keystore(cfg).expect("a bad base store is not fatal");
    assert!(common::keystore_aliases(&layout.keystore_file()).is_empty());
}
