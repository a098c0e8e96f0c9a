//! Config hash stability across layering order and key reordering.

use btsim_config::{load_layered_yaml_from_strings, BtsimConfig};

const BASE: &str = r#"
server:
  bind_address: "0.0.0.0:8080"
trading:
  default_commission_micros: 500
persistence:
  backend: memory
"#;

const OVERLAY: &str = r#"
trading:
  default_commission_micros: 750
  suspension_blocks_all_trading: true
"#;

#[test]
fn merged_layers_produce_stable_hash_and_take_effect() {
    let a = load_layered_yaml_from_strings(&[BASE, OVERLAY]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE, OVERLAY]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);

    let cfg = BtsimConfig::from_loaded(&a).unwrap();
    assert_eq!(cfg.trading.default_commission_micros, 750);
    assert!(cfg.trading.suspension_blocks_all_trading);
    assert_eq!(cfg.server.bind_address, "0.0.0.0:8080");
}

#[test]
fn base_alone_differs_from_base_plus_overlay() {
    let base_only = load_layered_yaml_from_strings(&[BASE]).unwrap();
    let layered = load_layered_yaml_from_strings(&[BASE, OVERLAY]).unwrap();
    assert_ne!(base_only.config_hash, layered.config_hash);
}
