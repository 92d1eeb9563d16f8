use crate::dsl::node::{Mapping, Node, NodePath};
use crate::dsl::schema::{
    AccessFlags,
    AccessGrant,
    Carveout,
    CpuAssignment,
    CpuMode,
    Direction,
    DomainSpec,
    MemoryRange,
    OverlaySchema,
    RelationKind,
    RelationSpec,
    Section,
    SectionKey,
    DEFINITIONS_KEY,
    DOMAINS_KEY,
};

use super::coerce::{describe, to_bool, to_name, to_name_groups, to_names, to_string_set, to_u64};
use super::types::{Diagnostic, DiagnosticKind};

/// Check the resolved tree against the domain schema and build the typed
/// overlay. Every domain is checked even when an earlier one failed.
pub fn validate(root: &Node, strict_unknown_keys: bool) -> (OverlaySchema, Vec<Diagnostic>) {
    let mut checker = StructureChecker {
        strict_unknown_keys,
        diags: Vec::new(),
        domain: None,
    };
    let schema = checker.overlay(root);
    (schema, checker.diags)
}

struct StructureChecker {
    strict_unknown_keys: bool,
    diags: Vec<Diagnostic>,
    domain: Option<String>,
}

impl StructureChecker {
    fn overlay(&mut self, root: &Node) -> OverlaySchema {
        let mut schema = OverlaySchema::default();
        let root_path = NodePath::root();
        let Some(entries) = root.as_mapping() else {
            self.error(&root_path, format!("overlay root must be a mapping, found {}", describe(root)));
            return schema;
        };

        if !entries.contains_key(DOMAINS_KEY) {
            self.error(&root_path, format!("missing `{}`", DOMAINS_KEY));
        }

        for (key, value) in entries {
            let path = root_path.key(key);
            match key.as_str() {
                DEFINITIONS_KEY => {}
                DOMAINS_KEY => {
                    let Some(domains) = value.as_mapping() else {
                        self.error(&path, format!("`{}` must be a mapping", DOMAINS_KEY));
                        continue;
                    };
                    for (name, body) in domains {
                        self.domain = Some(name.clone());
                        let before = self.diags.len();
                        let mut domain = self.domain_spec(name, body, &path.key(name));
                        domain.rejected = self.diags[before..].iter().any(Diagnostic::is_error);
                        schema.domains.insert(name.clone(), domain);
                        self.domain = None;
                    }
                }
                _ => {
                    self.unknown_key(key, &path);
                    schema.passthrough.insert(key.clone(), value.clone());
                }
            }
        }
        schema
    }

    fn domain_spec(&mut self, name: &str, body: &Node, path: &NodePath) -> DomainSpec {
        let mut domain = DomainSpec::new(name);
        let Some(entries) = body.as_mapping() else {
            self.error(path, format!("domain must be a mapping, found {}", describe(body)));
            return domain;
        };

        for (key, value) in entries {
            let path = path.key(key);
            match Section::classify(key, value) {
                Section::Recognized(SectionKey::Compatible, v) => {
                    if let Some(set) = self.check(&path, to_string_set(v, key)) {
                        domain.compatible = set;
                    }
                }
                Section::Recognized(SectionKey::Id, v) => {
                    domain.id = self.check(&path, to_u64(v, key));
                }
                Section::Recognized(SectionKey::Cpus, v) => {
                    domain.cpus = self.cpus(v, &path);
                }
                Section::Recognized(SectionKey::Access, v) => {
                    domain.access = self.access(v, &path);
                }
                Section::Recognized(SectionKey::ReservedMemory, v) => {
                    self.reserved_memory(&mut domain, v, &path);
                }
                Section::Recognized(SectionKey::Memory, v) => {
                    domain.memory = self.ranges(v, &path);
                }
                Section::Recognized(SectionKey::Sram, v) => {
                    domain.sram = self.ranges(v, &path);
                }
                Section::Recognized(SectionKey::DomainToDomain, v) => {
                    self.domain_to_domain(&mut domain, v, &path);
                }
                Section::Passthrough(v) => {
                    self.unknown_key(key, &path);
                    domain.passthrough.insert(key.clone(), v.clone());
                }
            }
        }
        domain
    }

    // ---- cpus ----

    fn cpus(&mut self, node: &Node, path: &NodePath) -> Vec<CpuAssignment> {
        let items = match node {
            Node::Sequence(items) if !items.is_empty() => items.as_slice(),
            Node::Mapping(_) => std::slice::from_ref(node),
            _ => {
                self.error(path, "`cpus` must be a non-empty sequence".to_string());
                return Vec::new();
            }
        };
        let mut cpus = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let path = if node.as_sequence().is_some() { path.index(index) } else { path.clone() };
            if let Some(cpu) = self.cpu(item, &path) {
                cpus.push(cpu);
            }
        }
        cpus
    }

    fn cpu(&mut self, node: &Node, path: &NodePath) -> Option<CpuAssignment> {
        let entries = self.mapping(node, path, "cpu assignment")?;
        let mut cluster = None;
        let mut cpumask = None;
        let mut mode = CpuMode::default();
        for (key, value) in entries {
            let path = path.key(key);
            match key.as_str() {
                "cluster" => cluster = self.check(&path, to_name(value, key)),
                "cpumask" => cpumask = self.check(&path, to_u64(value, key)),
                "mode" => {
                    if let Some(m) = self.cpu_mode(value, &path) {
                        mode = m;
                    }
                }
                _ => self.unknown_key(key, &path),
            }
        }
        let cluster = self.require(cluster, path, "cluster", entries)?;
        let cpumask = self.require(cpumask, path, "cpumask", entries)?;
        Some(CpuAssignment {
            cluster,
            cpumask,
            mode,
        })
    }

    fn cpu_mode(&mut self, node: &Node, path: &NodePath) -> Option<CpuMode> {
        if let Node::Scalar(_) = node {
            let bits = self.check(path, to_u64(node, "mode"))?;
            if bits > 0xf {
                self.error(path, format!("`mode` bitmask {:#x} has unknown bits", bits));
                return None;
            }
            return Some(CpuMode::from_bits(bits));
        }
        let entries = self.mapping(node, path, "mode")?;
        let mut mode = CpuMode::default();
        let mut lockstep = None;
        let mut split = None;
        for (key, value) in entries {
            let path = path.key(key);
            match key.as_str() {
                "secure" => mode.secure = self.check(&path, to_bool(value, key)).unwrap_or(false),
                "el" => {
                    if let Some(el) = self.check(&path, to_u64(value, key)) {
                        if el > 3 {
                            self.error(&path, format!("`el` must be 0..=3, found {}", el));
                        } else {
                            mode.el = el as u8;
                        }
                    }
                }
                "lockstep" => lockstep = self.check(&path, to_bool(value, key)),
                "split" => split = self.check(&path, to_bool(value, key)),
                _ => self.unknown_key(key, &path),
            }
        }
        mode.lockstep = match (lockstep, split) {
            (Some(l), Some(s)) if l == s => {
                self.error(path, "`lockstep` and `split` contradict each other".to_string());
                l
            }
            (Some(l), _) => l,
            (None, Some(s)) => !s,
            (None, None) => false,
        };
        Some(mode)
    }

    // ---- access ----

    fn access(&mut self, node: &Node, path: &NodePath) -> Vec<AccessGrant> {
        let Some(items) = node.as_sequence() else {
            self.error(path, "`access` must be a sequence".to_string());
            return Vec::new();
        };
        let mut grants: Vec<AccessGrant> = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let path = path.index(index);
            let Some(entries) = self.mapping(item, &path, "access entry") else {
                continue;
            };
            let mut devs = None;
            let mut flags = AccessFlags::empty();
            for (key, value) in entries {
                let path = path.key(key);
                match key.as_str() {
                    "dev" => devs = self.check(&path, to_names(value, key)),
                    "flags" => {
                        if let Some(f) = self.access_flags(value, &path) {
                            flags = f;
                        }
                    }
                    _ => self.unknown_key(key, &path),
                }
            }
            let Some(devs) = self.require(devs, &path, "dev", entries) else {
                continue;
            };
            for dev in devs {
                self.upsert_grant(&mut grants, AccessGrant { dev, flags }, &path);
            }
        }
        grants
    }

    fn access_flags(&mut self, node: &Node, path: &NodePath) -> Option<AccessFlags> {
        let Node::Mapping(entries) = node else {
            let bits = self.check(path, to_u64(node, "flags"))?;
            let Ok(bits) = u32::try_from(bits) else {
                self.error(path, format!("`flags` {:#x} out of range", bits));
                return None;
            };
            let flags = AccessFlags::from_bits_truncate(bits);
            if flags.bits() != bits {
                self.error(path, format!("`flags` {:#x} has unknown bits", bits));
            }
            return Some(flags);
        };
        let mut flags = AccessFlags::empty();
        for (key, value) in entries {
            let path = path.key(key);
            let Some(flag) = AccessFlags::from_key(key) else {
                self.error(&path, format!("unknown access flag `{}`", key));
                continue;
            };
            if self.check(&path, to_bool(value, key)).unwrap_or(false) {
                flags |= flag;
            }
        }
        Some(flags)
    }

    /// Later grants of a device replace earlier ones.
    fn upsert_grant(&mut self, grants: &mut Vec<AccessGrant>, grant: AccessGrant, path: &NodePath) {
        match grants.iter_mut().find(|g| g.dev == grant.dev) {
            Some(existing) => {
                if existing.flags != grant.flags {
                    let diag = Diagnostic::new(
                        DiagnosticKind::MergeConflictWarning,
                        format!(
                            "device `{}` granted with flags {:#x}, then {:#x}; keeping the last",
                            grant.dev,
                            existing.flags.bits(),
                            grant.flags.bits()
                        ),
                    );
                    self.push(diag, path);
                }
                existing.flags = grant.flags;
            }
            None => grants.push(grant),
        }
    }

    // ---- memory ----

    fn reserved_memory(&mut self, domain: &mut DomainSpec, node: &Node, path: &NodePath) {
        match node {
            Node::Mapping(entries) => {
                for (key, value) in entries {
                    let path = path.key(key);
                    match value {
                        Node::Scalar(_) => {
                            domain.reserved_memory.attributes.insert(key.clone(), value.clone());
                        }
                        Node::Sequence(items) => {
                            for (index, item) in items.iter().enumerate() {
                                self.add_carveout(domain, item, Some(key), &path.index(index));
                            }
                        }
                        _ => self.add_carveout(domain, value, Some(key), &path),
                    }
                }
            }
            Node::Sequence(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.add_carveout(domain, item, None, &path.index(index));
                }
            }
            other => self.error(
                path,
                format!("`reserved-memory` must be a mapping or sequence, found {}", describe(other)),
            ),
        }
    }

    fn add_carveout(&mut self, domain: &mut DomainSpec, node: &Node, key: Option<&str>, path: &NodePath) {
        let Some(entries) = self.mapping(node, path, "carveout") else {
            return;
        };
        let mut name = None;
        let (range, no_map) = self.range_fields(entries, path, &mut |this, k, v, p| match k {
            "name" => {
                name = this.check(p, to_name(v, k));
                true
            }
            _ => false,
        });
        let Some(range) = range else {
            return;
        };
        let name = name
            .or_else(|| key.map(str::to_string))
            .unwrap_or_else(|| format!("memory@{:x}", range.start));
        let carveout = Carveout {
            name,
            start: range.start,
            size: range.size,
            no_map,
        };
        if !domain.reserved_memory.carveouts.contains(&carveout) {
            domain.reserved_memory.carveouts.push(carveout);
        }
    }

    fn ranges(&mut self, node: &Node, path: &NodePath) -> Vec<MemoryRange> {
        let items = match node {
            Node::Sequence(items) => items.as_slice(),
            Node::Mapping(_) => std::slice::from_ref(node),
            other => {
                self.error(path, format!("memory ranges must be a sequence, found {}", describe(other)));
                return Vec::new();
            }
        };
        let mut ranges = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let path = if node.as_sequence().is_some() { path.index(index) } else { path.clone() };
            let Some(entries) = self.mapping(item, &path, "memory range") else {
                continue;
            };
            let (range, _) = self.range_fields(entries, &path, &mut |_, _, _, _| false);
            ranges.extend(range);
        }
        ranges
    }

    /// Reads `start`, `size` and `no-map`; other keys go to `extra` first.
    fn range_fields(
        &mut self,
        entries: &Mapping,
        path: &NodePath,
        extra: &mut dyn FnMut(&mut Self, &str, &Node, &NodePath) -> bool,
    ) -> (Option<MemoryRange>, bool) {
        let mut start = None;
        let mut size = None;
        let mut no_map = false;
        for (key, value) in entries {
            let path = path.key(key);
            match key.as_str() {
                "start" => start = self.check(&path, to_u64(value, key)),
                "size" => size = self.check(&path, to_u64(value, key)),
                "no-map" => no_map = self.check(&path, to_bool(value, key)).unwrap_or(false),
                _ => {
                    if !extra(self, key, value, &path) {
                        self.unknown_key(key, &path);
                    }
                }
            }
        }
        let start = self.require(start, path, "start", entries);
        let size = self.require(size, path, "size", entries);
        match (start, size) {
            (Some(start), Some(size)) => (Some(MemoryRange { start, size }), no_map),
            _ => (None, no_map),
        }
    }

    // ---- relations ----

    fn domain_to_domain(&mut self, domain: &mut DomainSpec, node: &Node, path: &NodePath) {
        let Some(entries) = self.mapping(node, path, "domain-to-domain") else {
            return;
        };
        for (key, value) in entries {
            let path = path.key(key);
            if key == "compatible" {
                if let Some(set) = self.check(&path, to_string_set(value, key)) {
                    domain.relation_compatible = set;
                }
                continue;
            }
            let Some(kind) = RelationKind::from_key(key) else {
                self.unknown_key(key, &path);
                continue;
            };
            match value {
                Node::Sequence(items) => {
                    for (index, item) in items.iter().enumerate() {
                        domain.relations.extend(self.relation(kind, item, &path.index(index)));
                    }
                }
                other => domain.relations.extend(self.relation(kind, other, &path)),
            }
        }
    }

    fn relation(&mut self, kind: RelationKind, node: &Node, path: &NodePath) -> Option<RelationSpec> {
        let entries = self.mapping(node, path, kind.as_str())?;
        let remote = entries.get("remote");
        let host = entries.get("host");
        let (direction, targets_node) = match (remote, host) {
            (Some(r), None) => (Direction::Remote, r),
            (None, Some(h)) if kind == RelationKind::Rpmsg => (Direction::Host, h),
            (None, Some(_)) => {
                self.error(path, format!("{} requires `remote`", kind));
                return None;
            }
            (Some(_), Some(_)) => {
                self.error(path, format!("{} has both `remote` and `host`", kind));
                return None;
            }
            (None, None) => {
                self.error(path, format!("{} needs `remote` or `host`", kind));
                return None;
            }
        };
        let targets_path = path.key(direction.as_str());
        let targets = self.check(&targets_path, to_names(targets_node, direction.as_str()))?;
        if targets.is_empty() {
            self.error(&targets_path, format!("`{}` must name at least one domain", direction.as_str()));
            return None;
        }

        let mut relation = RelationSpec::new(kind, direction, targets);
        relation.path = path.clone();
        for (key, value) in entries {
            let path = path.key(key);
            match key.as_str() {
                "remote" | "host" => {}
                "compatible" => {
                    if let Some(set) = self.check(&path, to_string_set(value, key)) {
                        relation.compatible = set;
                    }
                }
                "elfload" => {
                    if let Some(groups) = self.check(&path, to_name_groups(value, key)) {
                        relation.elfload = groups;
                    }
                }
                "carveouts" => {
                    if let Some(groups) = self.check(&path, to_name_groups(value, key)) {
                        if groups.len() > 1 && groups.len() != relation.targets.len() {
                            self.error(
                                &path,
                                format!(
                                    "{} carveout groups for {} target(s)",
                                    groups.len(),
                                    relation.targets.len()
                                ),
                            );
                        }
                        relation.carveouts = groups;
                    }
                }
                "mbox" => {
                    if let Some(mbox) = self.check(&path, to_names(value, key)) {
                        relation.mbox = mbox;
                    }
                }
                _ => self.unknown_key(key, &path),
            }
        }
        Some(relation)
    }

    // ---- helpers ----

    fn mapping<'n>(&mut self, node: &'n Node, path: &NodePath, what: &str) -> Option<&'n Mapping> {
        let entries = node.as_mapping();
        if entries.is_none() {
            self.error(path, format!("{} must be a mapping, found {}", what, describe(node)));
        }
        entries
    }

    fn check<T>(&mut self, path: &NodePath, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.error(path, message);
                None
            }
        }
    }

    /// Reports a missing field unless it was present but malformed.
    fn require<T>(&mut self, value: Option<T>, path: &NodePath, field: &str, entries: &Mapping) -> Option<T> {
        if value.is_none() && !entries.contains_key(field) {
            self.error(path, format!("missing required field `{}`", field));
        }
        value
    }

    fn unknown_key(&mut self, key: &str, path: &NodePath) {
        let diag = if self.strict_unknown_keys {
            Diagnostic::new(DiagnosticKind::SchemaViolationError, format!("unknown key `{}`", key))
        } else {
            Diagnostic::new(DiagnosticKind::UnknownKeyInfo, format!("unknown key `{}` passed through", key))
        };
        self.push(diag, path);
    }

    fn error(&mut self, path: &NodePath, message: String) {
        self.push(Diagnostic::new(DiagnosticKind::SchemaViolationError, message), path);
    }

    fn push(&mut self, diag: Diagnostic, path: &NodePath) {
        let diag = match &self.domain {
            Some(domain) => diag.with_domain(domain.clone()),
            None => diag,
        };
        self.diags.push(diag.at(path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parser::{parse_overlay, DslFormat};
    use crate::dsl::resolver::resolve_document;

    fn check_yaml(yaml: &str, strict: bool) -> (OverlaySchema, Vec<Diagnostic>) {
        let docs = parse_overlay(yaml, DslFormat::Yaml).unwrap();
        let resolved = resolve_document(&docs[0]);
        assert!(!resolved.has_errors(), "{:?}", resolved.diagnostics);
        validate(&resolved.root, strict)
    }

    fn kinds(diags: &[Diagnostic]) -> Vec<DiagnosticKind> {
        diags.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_full_domain() {
        let yaml = r#"
domains:
  a53:
    compatible: "openamp,domain-v1"
    id: 0x8
    cpus:
      - cluster: cpus_a53
        cpumask: "0x3"
        mode: {secure: true, el: 3}
    access:
      - dev: [ipi@ff340000, psu_ocm_0]
        flags: {exclusive: true}
    reserved-memory:
      ranges: true
      vring0:
        start: 0x3ed40000
        size: 0x2000
        no-map: 1
    memory:
      - start: 0x0
        size: 0x80000000
    sram:
      start: 0xfffc0000
      size: 0x40000
"#;
        let (schema, diags) = check_yaml(yaml, false);
        assert!(diags.is_empty(), "{:?}", diags);
        let a53 = schema.domain("a53").unwrap();
        assert_eq!(a53.id, Some(8));
        assert!(a53.compatible.contains("openamp,domain-v1"));
        assert_eq!(a53.cpus[0].cpumask, 3);
        assert!(a53.cpus[0].mode.secure);
        assert_eq!(a53.cpus[0].mode.el, 3);
        assert_eq!(a53.access.len(), 2);
        assert_eq!(a53.access[1].flags, AccessFlags::EXCLUSIVE);
        assert_eq!(a53.reserved_memory.attributes.get("ranges"), Some(&Node::bool(true)));
        let vring = a53.carveout("vring0").unwrap();
        assert_eq!(vring.start, 0x3ed4_0000);
        assert!(vring.no_map);
        assert_eq!(a53.memory.len(), 1);
        assert_eq!(a53.sram[0].size, 0x40000);
    }

    #[test]
    fn test_missing_cluster_and_bad_mask_collected() {
        let yaml = r#"
domains:
  r5:
    cpus:
      - cpumask: -1
  other:
    cpus: []
"#;
        let (schema, diags) = check_yaml(yaml, false);
        assert_eq!(schema.domains.len(), 2);
        assert_eq!(diags.len(), 3);
        assert!(diags.iter().all(|d| d.kind == DiagnosticKind::SchemaViolationError));
        assert!(diags.iter().any(|d| d.message.contains("missing required field `cluster`")));
        assert!(diags.iter().any(|d| d.message.contains("non-negative")));
        assert_eq!(diags[2].domain.as_deref(), Some("other"));
        assert!(schema.domains.values().all(|d| d.rejected));
    }

    #[test]
    fn test_only_failing_domain_is_rejected() {
        let yaml = "domains:\n  broken:\n    cpus: []\n  fine:\n    id: 1\n    extra: x\n";
        let (schema, _) = check_yaml(yaml, false);
        assert!(schema.domain("broken").unwrap().rejected);
        assert!(!schema.domain("fine").unwrap().rejected);
    }

    #[test]
    fn test_integer_cpu_mode() {
        let yaml = "domains:\n  r5:\n    cpus:\n      - {cluster: cpus_r5, cpumask: 0x1, mode: 0x2}\n";
        let (schema, diags) = check_yaml(yaml, false);
        assert!(diags.is_empty());
        assert!(schema.domain("r5").unwrap().cpus[0].mode.lockstep);
    }

    #[test]
    fn test_split_mode() {
        let yaml = "domains:\n  r5:\n    cpus:\n      - {cluster: c, cpumask: 1, mode: {split: true}}\n";
        let (schema, _) = check_yaml(yaml, false);
        assert!(!schema.domain("r5").unwrap().cpus[0].mode.lockstep);
    }

    #[test]
    fn test_duplicate_grant_last_wins() {
        let yaml = r#"
domains:
  a53:
    access:
      - {dev: ocm, flags: 0}
      - {dev: ocm, flags: 1}
"#;
        let (schema, diags) = check_yaml(yaml, false);
        let a53 = schema.domain("a53").unwrap();
        assert_eq!(a53.access.len(), 1);
        assert_eq!(a53.access[0].flags, AccessFlags::EXCLUSIVE);
        assert_eq!(kinds(&diags), vec![DiagnosticKind::MergeConflictWarning]);
    }

    #[test]
    fn test_reserved_memory_from_append_merge_dedups() {
        let yaml = r#"
definitions:
  vring0: &vring0
    - {start: 0x3ed40000, size: 0x2000, no-map: 1}
  buffer: &buffer
    - {start: 0x3ed48000, size: 0x100000, no-map: 1}
domains:
  a53:
    reserved-memory:
      <<+: [*vring0, *buffer, *vring0]
"#;
        let (schema, diags) = check_yaml(yaml, false);
        assert!(diags.is_empty(), "{:?}", diags);
        let names: Vec<_> = schema.domain("a53").unwrap().reserved_memory.carveouts
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["vring0", "buffer"]);
    }

    #[test]
    fn test_reserved_memory_sequence_form() {
        let yaml = r#"
domains:
  a53:
    reserved-memory:
      - {name: rproc0, start: 0x3ed00000, size: 0x40000}
      - {start: 0x3ef00000, size: 0x1000}
"#;
        let (schema, diags) = check_yaml(yaml, false);
        assert!(diags.is_empty());
        let carveouts = &schema.domain("a53").unwrap().reserved_memory.carveouts;
        assert_eq!(carveouts[0].name, "rproc0");
        assert_eq!(carveouts[1].name, "memory@3ef00000");
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let yaml = "vendor: {x: 1}\ndomains:\n  a53:\n    pinctrl: [a]\n";
        let (schema, diags) = check_yaml(yaml, false);
        assert_eq!(
            kinds(&diags),
            vec![DiagnosticKind::UnknownKeyInfo, DiagnosticKind::UnknownKeyInfo]
        );
        assert!(schema.passthrough.contains_key("vendor"));
        assert!(schema.domain("a53").unwrap().passthrough.contains_key("pinctrl"));

        let (_, strict) = check_yaml(yaml, true);
        assert!(strict.iter().all(|d| d.kind == DiagnosticKind::SchemaViolationError));
    }

    #[test]
    fn test_relations() {
        let yaml = r#"
domains:
  a53:
    domain-to-domain:
      compatible: openamp,domain-to-domain-v1
      remoteproc-relation:
        remote: [r5_0, r5_1]
        elfload:
          - [tcm_0a, tcm_0b]
          - [tcm_1a, tcm_1b]
      rpmsg-relation:
        - remote: r5_0
          carveouts: [vring0, vring1]
          mbox: ipi@ff340000
  r5_0:
    domain-to-domain:
      rpmsg-relation:
        host: a53
"#;
        let (schema, diags) = check_yaml(yaml, false);
        assert!(diags.is_empty(), "{:?}", diags);
        let a53 = schema.domain("a53").unwrap();
        assert!(a53.relation_compatible.contains("openamp,domain-to-domain-v1"));
        assert_eq!(a53.relations.len(), 2);
        let rproc = &a53.relations[0];
        assert_eq!(rproc.kind, RelationKind::Remoteproc);
        assert_eq!(rproc.targets, vec!["r5_0", "r5_1"]);
        assert_eq!(rproc.elfload.len(), 2);
        let rpmsg = &a53.relations[1];
        assert_eq!(rpmsg.carveouts_for(0), ["vring0".to_string(), "vring1".to_string()]);
        assert_eq!(rpmsg.mbox, vec!["ipi@ff340000"]);
        assert_eq!(rpmsg.path.to_string(), "domains.a53.domain-to-domain.rpmsg-relation[0]");

        let r5 = schema.domain("r5_0").unwrap();
        assert_eq!(r5.relations[0].direction, Direction::Host);
    }

    #[test]
    fn test_relation_direction_errors() {
        let yaml = r#"
domains:
  a:
    domain-to-domain:
      rpmsg-relation: {remote: b, host: c}
      remoteproc-relation: {host: b}
  b:
    domain-to-domain:
      rpmsg-relation: {mbox: x}
"#;
        let (schema, diags) = check_yaml(yaml, false);
        assert_eq!(diags.len(), 3);
        assert!(schema.domain("a").unwrap().relations.is_empty());
        assert!(diags[1].message.contains("requires `remote`"));
    }

    #[test]
    fn test_root_must_be_mapping() {
        let (_, diags) = validate(&Node::int(1), false);
        assert_eq!(diags.len(), 1);
        let (_, diags) = validate(&Node::mapping([("definitions", Node::null())]), false);
        assert!(diags[0].message.contains("missing `domains`"));
    }
}
