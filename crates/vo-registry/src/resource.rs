//! Flattened resource records and dispatch to concrete service clients.

use lazy_static::lazy_static;

use vo_dal::record::Record;
use vo_dal::scs::ScsService;
use vo_dal::sia::SiaService;
use vo_dal::sla::SlaService;
use vo_dal::ssa::SsaService;
use vo_dal::tap::TapService;

/// Decodes a `#`-delimited registry list cell.
///
/// The wire format delimits with `#` at both ends and between elements, so
/// `"#Radio#Optical#"` decodes to `["Radio", "Optical"]` and an empty cell
/// decodes to an empty list.
pub fn decode_list(cell: &str) -> Vec<String> {
    if cell.is_empty() {
        return Vec::new();
    }
    cell.trim_matches('#')
        .split('#')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// A concrete data-access client built from a registry resource.
#[derive(Debug, Clone)]
pub enum VoService {
    /// A cone search client.
    Cone(ScsService),
    /// An image access client.
    Image(SiaService),
    /// A spectral access client.
    Spectrum(SsaService),
    /// A line access client.
    Line(SlaService),
    /// A table access client.
    Table(TapService),
}

type ServiceCtor = fn(String) -> VoService;

lazy_static! {
    // Constructed once and only read afterwards; standard IDs are matched
    // by prefix so versioned identifiers also dispatch.
    static ref STANDARD_ID_DISPATCH: Vec<(&'static str, ServiceCtor)> = vec![
        ("ivo://ivoa.net/std/conesearch", |url| VoService::Cone(ScsService::new(url))),
        ("ivo://ivoa.net/std/sia", |url| VoService::Image(SiaService::new(url))),
        ("ivo://ivoa.net/std/ssa", |url| VoService::Spectrum(SsaService::new(url))),
        ("ivo://ivoa.net/std/slap", |url| VoService::Line(SlaService::new(url))),
        ("ivo://ivoa.net/std/tap", |url| VoService::Table(TapService::new(url))),
    ];
}

/// One registry capability row, flattened into named accessors.
#[derive(Debug, Copy, Clone)]
pub struct ResourceRecord<'a> {
    record: Record<'a>,
}

impl<'a> ResourceRecord<'a> {
    pub(crate) fn new(record: Record<'a>) -> Self {
        Self { record }
    }

    /// The generic record underneath.
    pub fn record(&self) -> &Record<'a> {
        &self.record
    }

    fn text(&self, name: &str) -> Option<&'a str> {
        self.record.get(name)?.as_str().filter(|s| !s.is_empty())
    }

    fn list(&self, name: &str) -> Vec<String> {
        self.text(name).map(decode_list).unwrap_or_default()
    }

    /// Resource title.
    pub fn title(&self) -> Option<&'a str> {
        self.text("title")
    }

    /// Short name the publisher assigned to the resource.
    pub fn shortname(&self) -> Option<&'a str> {
        self.text("shortName")
    }

    /// IVOA identifier of the resource.
    pub fn ivoid(&self) -> Option<&'a str> {
        self.text("identifier")
    }

    /// Base URL of this capability's service interface.
    pub fn accessurl(&self) -> Option<&'a str> {
        self.text("accessURL")
    }

    /// Registry capability class of this row.
    pub fn capability_class(&self) -> Option<&'a str> {
        self.text("capabilityClass")
    }

    /// IVOA standard identifier of this capability.
    pub fn standard_id(&self) -> Option<&'a str> {
        self.text("capabilityStandardID")
    }

    /// Publisher of the resource.
    pub fn publisher(&self) -> Option<&'a str> {
        self.text("publisher")
    }

    /// Free-text description of the resource.
    pub fn description(&self) -> Option<&'a str> {
        self.text("description")
    }

    /// Wavebands the resource covers.
    pub fn waveband(&self) -> Vec<String> {
        self.list("waveband")
    }

    /// Subject keywords attached to the resource.
    pub fn subjects(&self) -> Vec<String> {
        self.list("subject")
    }

    /// Resource type tags.
    pub fn types(&self) -> Vec<String> {
        self.list("type")
    }

    /// Declared content levels (research, amateur, ...).
    pub fn content_levels(&self) -> Vec<String> {
        self.list("contentLevel")
    }

    /// Builds the concrete service client this capability row describes.
    ///
    /// Returns `None` when the standard ID is unrecognized or the row
    /// carries no access URL; unknown services are not an error.
    pub fn to_service(&self) -> Option<VoService> {
        let standard_id = self.standard_id()?.to_lowercase();
        let access_url = self.accessurl()?;
        STANDARD_ID_DISPATCH
            .iter()
            .find(|(prefix, _)| standard_id.starts_with(prefix))
            .map(|(_, ctor)| ctor(access_url.to_string()))
    }
}
