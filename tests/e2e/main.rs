#[macro_use]
mod macros;
mod runner;

e2e_test_cases!(
    "tests/e2e/cases",
    e2e_openamp_three_clusters => "openamp_three_clusters",
    e2e_openamp_two_remotes => "openamp_two_remotes",
    e2e_layered_inputs => "layered_inputs",
    e2e_shared_access => "shared_access",
    e2e_missing_carveout => "missing_carveout",
    e2e_ungranted_mailbox => "ungranted_mailbox",
    e2e_exclusive_conflict => "exclusive_conflict",
    e2e_lockstep_conflict => "lockstep_conflict",
    e2e_cyclic_anchor => "cyclic_anchor",
    e2e_undefined_anchor => "undefined_anchor",
    e2e_unpaired_relation => "unpaired_relation",
    e2e_strict_unknown_keys => "strict_unknown_keys",
    e2e_independent_domains => "independent_domains",
);
