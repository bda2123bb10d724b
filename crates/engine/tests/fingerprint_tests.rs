mod common;

use common::Layout;
use vardr_engine as ve;

#[test]
fn fingerprint_ignores_creation_order() {
    let pems: Vec<(String, String)> = ["alpha", "beta", "gamma", "delta"]
        .iter()
        .map(|n| (format!("{n}.crt"), common::generate_cert_pem(n)))
        .collect();

    let forward = Layout::new();
    for (name, pem) in &pems {
        forward.write(name, pem);
    }
    let backward = Layout::new();
    for (name, pem) in pems.iter().rev() {
        backward.write(name, pem);
    }

    let a = ve::reconcile_pem_bundle(forward.config()).unwrap();
    let b = ve::reconcile_pem_bundle(backward.config()).unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);
}

#[test]
fn fingerprint_is_sha256_of_sorted_contents() {
    let layout = Layout::new();
    layout.write("b.crt", "second");
    layout.write("a.crt", "first");

    let outcome = ve::reconcile_pem_bundle(layout.config()).unwrap();
    let expected = hex::encode(openssl::sha::sha256(b"firstsecond"));
    assert_eq!(outcome.fingerprint.as_str(), expected);
}

// Names do not enter the digest: a rename that keeps the relative order of
// contents is a cache hit and the stored alias stays until the next content
// change. A rename that reorders contents is a rebuild.
#[test]
fn rename_keeping_order_is_a_cache_hit() {
    let layout = Layout::new();
    let pem_a = common::generate_cert_pem("a");
    let pem_b = common::generate_cert_pem("b");
    layout.write("a.crt", &pem_a);
    let old = layout.write("b.crt", &pem_b);
    ve::reconcile_keystore(layout.config()).unwrap();

    std::fs::rename(old, layout.certs_dir().join("c.crt")).unwrap();
    let outcome = ve::reconcile_keystore(layout.config()).unwrap();
    assert!(outcome.is_unchanged());
    assert_eq!(common::keystore_aliases(&layout.keystore_file()), vec!["a", "b"]);
}

#[test]
fn rename_changing_order_is_a_rebuild() {
    let layout = Layout::new();
    layout.write("a.crt", common::generate_cert_pem("a"));
    let old = layout.write("b.crt", common::generate_cert_pem("b"));
    ve::reconcile_keystore(layout.config()).unwrap();

    std::fs::rename(old, layout.certs_dir().join("0.crt")).unwrap();
    let outcome = ve::reconcile_keystore(layout.config()).unwrap();
    assert!(!outcome.is_unchanged());
    assert_eq!(common::keystore_aliases(&layout.keystore_file()), vec!["0", "a"]);
}

#[test]
fn non_certificate_files_do_not_affect_fingerprint() {
    let layout = Layout::new();
    layout.write_valid("a.crt");
    let first = ve::reconcile_pem_bundle(layout.config()).unwrap();

    layout.write("README.md", "mount your CA files here");
    let second = ve::reconcile_pem_bundle(layout.config()).unwrap();
    assert_eq!(first.fingerprint, second.fingerprint);
    assert!(second.is_unchanged());
}
