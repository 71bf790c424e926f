//! YANG file discovery under the corpus root.
//!
//! Dependency resolution stays off the table: the validator's recursive
//! lookup is far too slow for corpora of this size, so a fixed set of
//! dependency directories is handed over via `--path` instead.

use std::fs;
use std::path::Path;

/// Hidden directories (`.git` above all) never contribute YANG files.
pub fn has_hidden_component(path: &Path) -> bool {
    path.components().any(|part| {
        part.as_os_str()
            .to_str()
            .is_some_and(|text| text.starts_with('.'))
    })
}

/// Lists every `*.yang` file under `root`, sorted, as corpus-relative paths.
pub fn discover_yang_files(root: &Path) -> Result<Vec<String>, String> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries =
            fs::read_dir(&dir).map_err(|err| format!("cannot read {}: {err}", dir.display()))?;
        for entry in entries {
            let entry =
                entry.map_err(|err| format!("cannot read {}: {err}", dir.display()))?;
            let path = entry.path();
            let rel = path.strip_prefix(root).unwrap_or(&path);
            if has_hidden_component(rel) {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if path.extension().and_then(|v| v.to_str()) == Some("yang") {
                out.push(rel.display().to_string());
            }
        }
    }
    out.sort();
    Ok(out)
}

/// The dependency directories passed to the validator via `--path`.
pub fn model_path_set() -> Vec<String> {
    [
        "yang/experimental/ieee",
        "yang/experimental/ieee/1588",
        "yang/experimental/ieee/1906.1",
        "yang/experimental/ietf",
        "yang/experimental/ietf-extracted-YANG-modules",
        "yang/experimental/mano-models",
        "yang/experimental/odp",
        "yang/experimental/openconfig/release/models",
        "yang/experimental/openconfig/release/models/acl",
        "yang/experimental/openconfig/release/models/aft",
        "yang/experimental/openconfig/release/models/bfd",
        "yang/experimental/openconfig/release/models/bgp",
        "yang/experimental/openconfig/release/models/catalog",
        "yang/experimental/openconfig/release/models/interfaces",
        "yang/experimental/openconfig/release/models/isis",
        "yang/experimental/openconfig/release/models/lacp",
        "yang/experimental/openconfig/release/models/lldp",
        "yang/experimental/openconfig/release/models/local-routing",
        "yang/experimental/openconfig/release/models/macsec",
        "yang/experimental/openconfig/release/models/mpls",
        "yang/experimental/openconfig/release/models/multicast",
        "yang/experimental/openconfig/release/models/network-instance",
        "yang/experimental/openconfig/release/models/openflow",
        "yang/experimental/openconfig/release/models/optical-transport",
        "yang/experimental/openconfig/release/models/ospf",
        "yang/experimental/openconfig/release/models/platform",
        "yang/experimental/openconfig/release/models/policy",
        "yang/experimental/openconfig/release/models/policy-forwarding",
        "yang/experimental/openconfig/release/models/probes",
        "yang/experimental/openconfig/release/models/qos",
        "yang/experimental/openconfig/release/models/relay-agent",
        "yang/experimental/openconfig/release/models/rib",
        "yang/experimental/openconfig/release/models/segment-routing",
        "yang/experimental/openconfig/release/models/stp",
        "yang/experimental/openconfig/release/models/system",
        "yang/experimental/openconfig/release/models/telemetry",
        "yang/experimental/openconfig/release/models/types",
        "yang/experimental/openconfig/release/models/vlan",
        "yang/experimental/openconfig/release/models/wifi",
        "yang/standard/ieee/draft/1906.1",
        "yang/standard/ieee/draft/802.1/ABcu",
        "yang/standard/ieee/draft/802.1/AEdk",
        "yang/standard/ieee/draft/802.1/CBcv",
        "yang/standard/ieee/draft/802.1/CBdb",
        "yang/standard/ieee/draft/802.1/Qcr",
        "yang/standard/ieee/draft/802.1/Qcw",
        "yang/standard/ieee/draft/802.1/Qcx",
        "yang/standard/ieee/draft/802.1/Qcz",
        "yang/standard/ieee/published/802.1",
        "yang/standard/ieee/published/802.3",
        "yang/standard/ietf/DRAFT",
        "yang/standard/ietf/RFC",
        "yang/vendor/ciena",
        "yang/vendor/fujitsu",
        "yang/vendor/huawei",
        "yang/vendor/nokia",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
