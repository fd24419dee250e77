//! Protocol tags and the per-protocol capability descriptors.
//!
//! Rather than subclassing a query/results pair per protocol, the generic
//! core is parameterized by one of these descriptor values: where the
//! results resource lives in a response document and how semantic field
//! roles resolve to columns via UCD or UType lookup.

/// The Virtual Observatory protocol a query or response belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Simple Cone Search.
    Cone,
    /// Simple Image Access.
    Sia,
    /// Simple Spectral Access.
    Ssa,
    /// Simple Line Access.
    Sla,
    /// Table Access Protocol.
    Tap,
    /// Registry search.
    Registry,
    /// Datalink follow-on access.
    Datalink,
}

impl Protocol {
    /// Short lowercase tag used in error context and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cone => "scs",
            Self::Sia => "sia",
            Self::Ssa => "ssa",
            Self::Sla => "slap",
            Self::Tap => "tap",
            Self::Registry => "registry",
            Self::Datalink => "datalink",
        }
    }

    /// Default protocol version reported in error context.
    pub fn default_version(&self) -> &'static str {
        match self {
            Self::Cone | Self::Sia | Self::Sla | Self::Registry => "1.0",
            Self::Ssa | Self::Tap => "1.1",
            Self::Datalink => "1.0",
        }
    }

    /// The capability descriptor driving response interpretation.
    pub fn descriptor(&self) -> &'static CapabilityDescriptor {
        match self {
            Self::Cone => &SCS_DESCRIPTOR,
            Self::Sia => &SIA_DESCRIPTOR,
            Self::Ssa => &SSA_DESCRIPTOR,
            Self::Sla => &SLA_DESCRIPTOR,
            Self::Tap => &TAP_DESCRIPTOR,
            Self::Registry => &REGISTRY_DESCRIPTOR,
            Self::Datalink => &DATALINK_DESCRIPTOR,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Semantic role a standardized column plays in a record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Primary record identifier.
    Id,
    /// Human-readable dataset title.
    Title,
    /// Right ascension in degrees.
    Ra,
    /// Declination in degrees.
    Dec,
    /// Instrument identifier.
    Instrument,
    /// Observation date.
    DateObs,
    /// Dataset media type.
    Format,
    /// Dataset access reference URL.
    AccessUrl,
    /// Spectral line wavelength.
    Wavelength,
}

/// Where the results resource sits inside a response document.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResultsLocation {
    /// The first resource in the document (cone search convention).
    Root,
    /// The resource explicitly typed `results`, falling back to the first
    /// resource holding a table.
    TypedResults,
}

/// UCD and UType keys used to resolve one field role.
#[derive(Debug)]
pub struct RoleKeys {
    /// The role resolved by these keys.
    pub role: FieldRole,
    /// Candidate UCDs, tried in order.
    pub ucds: &'static [&'static str],
    /// Candidate UTypes, tried in order (namespace prefixes ignored).
    pub utypes: &'static [&'static str],
}

const fn role(
    role: FieldRole,
    ucds: &'static [&'static str],
    utypes: &'static [&'static str],
) -> RoleKeys {
    RoleKeys { role, ucds, utypes }
}

/// Everything the generic core needs to know about one protocol's responses.
#[derive(Debug)]
pub struct CapabilityDescriptor {
    /// Where the results resource lives.
    pub results_location: ResultsLocation,
    /// Role resolution table for standardized metadata columns.
    pub roles: &'static [RoleKeys],
}

/// Descriptor for Simple Cone Search responses.
pub static SCS_DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
    results_location: ResultsLocation::Root,
    roles: &[
        role(FieldRole::Id, &["ID_MAIN"], &[]),
        role(FieldRole::Ra, &["POS_EQ_RA_MAIN"], &[]),
        role(FieldRole::Dec, &["POS_EQ_DEC_MAIN"], &[]),
    ],
};

/// Descriptor for Simple Image Access responses.
pub static SIA_DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
    results_location: ResultsLocation::TypedResults,
    roles: &[
        role(FieldRole::Title, &["VOX:Image_Title"], &[]),
        role(FieldRole::Ra, &["POS_EQ_RA_MAIN"], &[]),
        role(FieldRole::Dec, &["POS_EQ_DEC_MAIN"], &[]),
        role(FieldRole::Instrument, &["INST_ID"], &[]),
        role(FieldRole::DateObs, &["VOX:Image_MJDateObs"], &[]),
        role(FieldRole::Format, &["VOX:Image_Format"], &[]),
        role(FieldRole::AccessUrl, &["VOX:Image_AccessReference"], &[]),
    ],
};

/// Descriptor for Simple Spectral Access responses.
pub static SSA_DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
    results_location: ResultsLocation::TypedResults,
    roles: &[
        role(FieldRole::Title, &[], &["DataID.Title"]),
        role(FieldRole::Ra, &["POS_EQ_RA_MAIN"], &[]),
        role(FieldRole::Dec, &["POS_EQ_DEC_MAIN"], &[]),
        role(FieldRole::Instrument, &[], &["DataID.Instrument"]),
        role(FieldRole::DateObs, &[], &["DataID.Date"]),
        role(FieldRole::Format, &[], &["Access.Format"]),
        role(FieldRole::AccessUrl, &["DATA_LINK"], &["Access.Reference"]),
    ],
};

/// Descriptor for Simple Line Access responses.
pub static SLA_DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
    results_location: ResultsLocation::TypedResults,
    roles: &[
        role(FieldRole::Title, &[], &["Line.title"]),
        role(FieldRole::Wavelength, &[], &["Line.wavelength.value"]),
    ],
};

/// Descriptor for Table Access Protocol responses.
pub static TAP_DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
    results_location: ResultsLocation::TypedResults,
    roles: &[],
};

/// Descriptor for registry search responses.
pub static REGISTRY_DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
    results_location: ResultsLocation::TypedResults,
    roles: &[],
};

/// Descriptor for Datalink responses.
pub static DATALINK_DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
    results_location: ResultsLocation::TypedResults,
    roles: &[],
};
