use std::collections::BTreeSet;
use std::fmt;

use bitflags::bitflags;
use indexmap::IndexMap;

use super::node::{Node, NodePath};

// ================================
// Overlay Schema
// ================================

/// Top-level key holding anchor definitions. Never validated.
pub const DEFINITIONS_KEY: &str = "definitions";
/// Top-level key holding the domain table.
pub const DOMAINS_KEY: &str = "domains";

/// Validated overlay: every declared domain in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlaySchema {
    pub domains: IndexMap<String, DomainSpec>,
    /// Unrecognized top-level entries, kept verbatim.
    pub passthrough: IndexMap<String, Node>,
}

impl OverlaySchema {
    pub fn domain(&self, name: &str) -> Option<&DomainSpec> {
        self.domains.get(name)
    }
}

/// A named hardware partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainSpec {
    pub name: String,
    /// Subsystem id, when the overlay assigns one.
    pub id: Option<u64>,
    pub compatible: BTreeSet<String>,
    pub cpus: Vec<CpuAssignment>,
    /// Order-significant; later grants of a device replace earlier ones.
    pub access: Vec<AccessGrant>,
    pub reserved_memory: ReservedMemory,
    pub memory: Vec<MemoryRange>,
    pub sram: Vec<MemoryRange>,
    /// `compatible` of the `domain-to-domain` block.
    pub relation_compatible: BTreeSet<String>,
    pub relations: Vec<RelationSpec>,
    pub passthrough: IndexMap<String, Node>,
    /// Schema validation failed; the spec is partial and graph checks skip it.
    pub rejected: bool,
}

impl DomainSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn grant(&self, dev: &str) -> Option<&AccessGrant> {
        self.access.iter().find(|g| g.dev == dev)
    }

    pub fn has_access(&self, dev: &str) -> bool {
        self.grant(dev).is_some()
    }

    pub fn carveout(&self, name: &str) -> Option<&Carveout> {
        self.reserved_memory.carveouts.iter().find(|c| c.name == name)
    }
}

/// Recognized per-domain keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKey {
    Compatible,
    Id,
    Cpus,
    Access,
    ReservedMemory,
    Memory,
    Sram,
    DomainToDomain,
}

impl SectionKey {
    pub const ALL: [SectionKey; 8] = [
        SectionKey::Compatible,
        SectionKey::Id,
        SectionKey::Cpus,
        SectionKey::Access,
        SectionKey::ReservedMemory,
        SectionKey::Memory,
        SectionKey::Sram,
        SectionKey::DomainToDomain,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKey::Compatible => "compatible",
            SectionKey::Id => "id",
            SectionKey::Cpus => "cpus",
            SectionKey::Access => "access",
            SectionKey::ReservedMemory => "reserved-memory",
            SectionKey::Memory => "memory",
            SectionKey::Sram => "sram",
            SectionKey::DomainToDomain => "domain-to-domain",
        }
    }
}

/// A domain entry: either a section the validator understands or a raw node
/// carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Section<'a> {
    Recognized(SectionKey, &'a Node),
    Passthrough(&'a Node),
}

impl<'a> Section<'a> {
    pub fn classify(key: &str, value: &'a Node) -> Self {
        match SectionKey::from_key(key) {
            Some(section) => Section::Recognized(section, value),
            None => Section::Passthrough(value),
        }
    }
}

// ================================
// CPUs
// ================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuAssignment {
    pub cluster: String,
    pub cpumask: u64,
    pub mode: CpuMode,
}

/// Execution mode of a CPU assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CpuMode {
    pub secure: bool,
    /// Exception level, 0..=3.
    pub el: u8,
    /// Lockstep when true, split otherwise.
    pub lockstep: bool,
}

impl CpuMode {
    /// Decode the packed form: bit 0 secure, bit 1 lockstep, bits 2-3 EL.
    pub fn from_bits(bits: u64) -> Self {
        Self {
            secure: bits & 0x1 != 0,
            lockstep: bits & 0x2 != 0,
            el: ((bits >> 2) & 0x3) as u8,
        }
    }

    pub fn bits(self) -> u64 {
        u64::from(self.secure) | (u64::from(self.lockstep) << 1) | (u64::from(self.el) << 2)
    }
}

// ================================
// Access
// ================================

bitflags! {
    /// Permission flags of a device grant. Zero means shared.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const EXCLUSIVE = 1 << 0;
        const SECURE = 1 << 1;
        const READ_ONLY = 1 << 2;
        const REQUESTED = 1 << 3;
        const COHERENT = 1 << 4;
        const VIRTUALIZED = 1 << 5;
    }
}

impl AccessFlags {
    /// Flag named by an overlay key such as `read-only`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.replace('_', "-").to_ascii_lowercase().as_str() {
            "exclusive" => Some(AccessFlags::EXCLUSIVE),
            "secure" => Some(AccessFlags::SECURE),
            "read-only" | "readonly" => Some(AccessFlags::READ_ONLY),
            "requested" => Some(AccessFlags::REQUESTED),
            "coherent" => Some(AccessFlags::COHERENT),
            "virtualized" => Some(AccessFlags::VIRTUALIZED),
            _ => None,
        }
    }

    /// Exclusive, writable claim; such a claim cannot be shared.
    pub fn is_exclusive_writable(self) -> bool {
        self.contains(AccessFlags::EXCLUSIVE) && !self.contains(AccessFlags::READ_ONLY)
    }

    /// Whether two domains may not both hold these grants on one device.
    pub fn conflicts_with(self, other: AccessFlags) -> bool {
        self.is_exclusive_writable() || other.is_exclusive_writable()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub dev: String,
    pub flags: AccessFlags,
}

// ================================
// Memory
// ================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Carveout {
    pub name: String,
    pub start: u64,
    pub size: u64,
    pub no_map: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservedMemory {
    /// Scalar entries such as `ranges: true`.
    pub attributes: IndexMap<String, Node>,
    pub carveouts: Vec<Carveout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRange {
    pub start: u64,
    pub size: u64,
}

// ================================
// Relations
// ================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Remoteproc,
    Rpmsg,
}

impl RelationKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "remoteproc-relation" => Some(RelationKind::Remoteproc),
            "rpmsg-relation" => Some(RelationKind::Rpmsg),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Remoteproc => "remoteproc-relation",
            RelationKind::Rpmsg => "rpmsg-relation",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which list the declaring domain used to name its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `remote: [...]`: the declaring domain is the host.
    Remote,
    /// `host: [...]`: the declaring domain is the remote.
    Host,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Remote => "remote",
            Direction::Host => "host",
        }
    }
}

/// One relation declaration inside `domain-to-domain`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSpec {
    pub kind: RelationKind,
    pub direction: Direction,
    pub targets: Vec<String>,
    pub compatible: BTreeSet<String>,
    /// One group of device names per remote.
    pub elfload: Vec<Vec<String>>,
    /// Per-target groups; a single group applies to every target.
    pub carveouts: Vec<Vec<String>>,
    pub mbox: Vec<String>,
    /// Location of the declaration, for diagnostics.
    pub path: NodePath,
}

impl RelationSpec {
    pub fn new(kind: RelationKind, direction: Direction, targets: Vec<String>) -> Self {
        Self {
            kind,
            direction,
            targets,
            compatible: BTreeSet::new(),
            elfload: Vec::new(),
            carveouts: Vec::new(),
            mbox: Vec::new(),
            path: NodePath::root(),
        }
    }

    /// Carveout names that apply to the target at `index`.
    pub fn carveouts_for(&self, index: usize) -> &[String] {
        match self.carveouts.as_slice() {
            [] => &[],
            [single] => single,
            groups => groups.get(index).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    pub fn elfload_for(&self, index: usize) -> &[String] {
        self.elfload.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(host, remote)` of the edge towards the target at `index`.
    pub fn endpoints<'a>(&'a self, declaring: &'a str, index: usize) -> Option<(&'a str, &'a str)> {
        let target = self.targets.get(index)?.as_str();
        Some(match self.direction {
            Direction::Remote => (declaring, target),
            Direction::Host => (target, declaring),
        })
    }
}
