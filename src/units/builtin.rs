//! Built-in geometry units.
//!
//! Each unit only produces the default parameters of the component it
//! configures; the geometry algorithms themselves live in the framework.

use crate::config::{ParameterSet, Value};
use crate::error::Result;
use crate::process::{Component, ComponentKind, LabelledComponent};
use crate::units::{DefaultsUnit, UnitOrigin};

/// A unit compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinUnit {
	/// Full dotted name, e.g. `Geometry.CSCGeometry.cscGeometry_cfi`.
	pub name: &'static str,

	/// One-line description for `pset units`.
	pub summary: &'static str,

	build: fn() -> Result<Vec<LabelledComponent>>,
}

impl BuiltinUnit {
	/// Last name segment without the `_cfi` suffix, e.g. `cscGeometry`.
	pub fn short_name(&self) -> &'static str {
		let last = self.name.rsplit('.').next().unwrap_or(self.name);
		last.strip_suffix("_cfi").unwrap_or(last)
	}

	/// Whether `name` refers to this unit, by full or short name.
	pub fn matches(&self, name: &str) -> bool {
		self.name == name || self.short_name() == name
	}
}

impl DefaultsUnit for BuiltinUnit {
	fn name(&self) -> &str {
		self.name
	}

	fn origin(&self) -> UnitOrigin {
		UnitOrigin::Builtin
	}

	fn produce(&self) -> Result<Vec<LabelledComponent>> {
		(self.build)()
	}
}

pub const BUILTIN_UNITS: &[BuiltinUnit] = &[
	BuiltinUnit {
		name: "Geometry.MuonNumbering.muonNumberingInitialization_cfi",
		summary: "muon numbering scheme constants",
		build: muon_numbering_initialization,
	},
	BuiltinUnit {
		name: "Geometry.MuonCommonData.muonEndcapIdealGeometryXML_cfi",
		summary: "ideal endcap muon geometry description files",
		build: muon_endcap_ideal_geometry_xml,
	},
	BuiltinUnit {
		name: "Geometry.CSCGeometry.cscGeometry_cfi",
		summary: "CSC geometry builder and layer/strip modelling flags",
		build: csc_geometry,
	},
];

fn single(label: &str, component: Component) -> Result<Vec<LabelledComponent>> {
	Ok(vec![LabelledComponent {
		label: label.to_string(),
		component,
	}])
}

fn muon_numbering_initialization() -> Result<Vec<LabelledComponent>> {
	single(
		"muonNumberingInitialization",
		Component::new(ComponentKind::EsProducer, "MuonNumberingInitialization"),
	)
}

const ENDCAP_GEOMETRY_FILES: &[&str] = &[
	"Geometry/CMSCommonData/data/materials.xml",
	"Geometry/CMSCommonData/data/rotations.xml",
	"Geometry/CMSCommonData/data/extend/cmsextent.xml",
	"Geometry/CMSCommonData/data/cms.xml",
	"Geometry/CMSCommonData/data/muonBase.xml",
	"Geometry/CMSCommonData/data/cmsMuon.xml",
	"Geometry/CMSCommonData/data/mgnt.xml",
	"Geometry/CMSCommonData/data/muonMagnet.xml",
	"Geometry/MuonCommonData/data/muonYoke.xml",
	"Geometry/MuonCommonData/data/mf.xml",
	"Geometry/MuonCommonData/data/muonNumbering.xml",
	"Geometry/MuonSimData/data/muonSens.xml",
	"Geometry/CSCGeometryBuilder/data/cscSpecsFilter.xml",
	"Geometry/CSCGeometryBuilder/data/cscSpecs.xml",
	"Geometry/MuonSimData/data/muonProdCuts.xml",
];

fn muon_endcap_ideal_geometry_xml() -> Result<Vec<LabelledComponent>> {
	let params = ParameterSet::from_entries([
		("geomXMLFiles", Value::from(ENDCAP_GEOMETRY_FILES)),
		("rootNodeName", Value::from("cms:OCMS")),
	])?;
	single(
		"XMLIdealGeometryESSource",
		Component::new(ComponentKind::EsSource, "XMLIdealGeometryESSource").with_params(params),
	)
}

// Loading this unit is what creates CSCGeometryESModule.
fn csc_geometry() -> Result<Vec<LabelledComponent>> {
	let params = ParameterSet::from_entries([
		("appendToDataLabel", Value::from("")),
		("alignmentsLabel", Value::from("")),
		("applyAlignment", Value::from(false)),
		("useRealWireGeometry", Value::from(true)),
		("useOnlyWiresInME1a", Value::from(false)),
		("useGangedStripsInME1a", Value::from(true)),
		("useCentreTIOffsets", Value::from(false)),
		("debugV", Value::from(false)),
	])?;
	single(
		"CSCGeometryESModule",
		Component::new(ComponentKind::EsProducer, "CSCGeometryESModule").with_params(params),
	)
}
