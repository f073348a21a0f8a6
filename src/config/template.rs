/// Process file written by `pset init`: dumps the CSC geometry with full
/// debug output for one empty event.
pub fn generate_init_template() -> &'static str {
	r#"# Dump CSC geometry information with CSCGeometryAnalyzer.
process = "GeometryTest"

# Extra directories searched for unit files, relative to this file.
# unit-paths = ["units"]

load = [
    # xml for endcap csc geometry
    "Geometry.MuonNumbering.muonNumberingInitialization_cfi",
    "Geometry.MuonCommonData.muonEndcapIdealGeometryXML_cfi",
    # flags for modelling of CSC layer & strip geometry
    "Geometry.CSCGeometry.cscGeometry_cfi",
]

[source]
type = "EmptySource"

[max-events]
input = 1

[services.EnableFloatingPointExceptions]
enableOverFlowEx = true
enableDivByZeroEx = true
enableInvalidEx = true
enableUnderFlowEx = false

[services.MessageLogger]
destinations = ["log", "errors", "debug"]
categories = ["CSC", "CSCNumbering", "CSCGeometryBuilderFromDDD", "RadialStripTopology"]
# For debug-level output
debugModules = ["*"]

[services.MessageLogger.errors]
threshold = "ERROR"
extension = ".out"

# No threshold: equivalent to INFO
[services.MessageLogger.log]
extension = ".out"

[services.MessageLogger.debug]
threshold = "DEBUG"
extension = ".out"
noLineBreaks = true
INFO = { limit = 0 }
DEBUG = { limit = 0 }
CSC = { limit = -1 }
CSCNumbering = { limit = -1 }
CSCGeometryBuilderFromDDD = { limit = -1 }
RadialStripTopology = { limit = -1 }

[modules.producer]
kind = "analyzer"
type = "CSCGeometryAnalyzer"

[paths]
p1 = ["producer"]

[overrides]
"CSCGeometryESModule.debugV" = true
"#
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::parse_process_str;
	use std::path::Path;

	#[test]
	fn test_template_parses() {
		let file = parse_process_str(generate_init_template(), Path::new("process.toml")).unwrap();
		assert_eq!(file.process, "GeometryTest");
		assert_eq!(file.load.len(), 3);
		assert_eq!(file.services.len(), 2);
		assert_eq!(file.paths.get("p1").unwrap(), &vec!["producer".to_string()]);
	}
}
