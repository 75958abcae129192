//! Fuzz target for TOML config parsing.
//!
//! Exercises raw TOML deserialization of `ConfigFile`, then rule expansion,
//! ratio validation and exclude glob compilation on whatever parses.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use deltacov_domain::{ClassExclusions, validate_rules};
use deltacov_types::{ConfigFile, ViolationRules};

#[derive(Arbitrary, Debug)]
struct FuzzConfig {
    use_structured: bool,
    raw_bytes: Vec<u8>,
    fail_on_violation: Option<bool>,
    blanket: Option<f64>,
    rules: Vec<(u8, f64)>,
    exclude_classes: Vec<String>,
}

const ENTITIES: [&str; 5] = ["instruction", "branch", "line", "complexity", "method"];

impl FuzzConfig {
    fn to_toml(&self) -> String {
        let mut out = String::from("[defaults]\n");
        if let Some(v) = self.fail_on_violation {
            out.push_str(&format!("fail_on_violation = {v}\n"));
        }
        if let Some(v) = self.blanket.filter(|v| v.is_finite()) {
            out.push_str(&format!("fail_if_coverage_less_than = {v:?}\n"));
        }
        let globs: Vec<String> = self
            .exclude_classes
            .iter()
            .map(|g| format!("{g:?}"))
            .collect();
        out.push_str(&format!("exclude_classes = [{}]\n", globs.join(", ")));
        for (entity, min) in &self.rules {
            if !min.is_finite() {
                continue;
            }
            out.push_str(&format!(
                "\n[[rule]]\nentity = \"{}\"\nmin_ratio = {min:?}\n",
                ENTITIES[usize::from(*entity) % ENTITIES.len()]
            ));
        }
        out
    }
}

fuzz_target!(|input: FuzzConfig| {
    let text = if input.use_structured {
        input.to_toml()
    } else {
        String::from_utf8_lossy(&input.raw_bytes).into_owned()
    };

    let Ok(cfg) = toml::from_str::<ConfigFile>(&text) else {
        return;
    };

    let rules = ViolationRules::from_config(&cfg);
    assert!(rules.rules.len() <= 5);
    if validate_rules(&rules).is_ok() {
        assert!(rules.rules.iter().all(|r| (0.0..=1.0).contains(&r.min_ratio)));
    }
    let _ = ClassExclusions::compile(&cfg.defaults.exclude_classes);
});
