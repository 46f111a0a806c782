/*!
# Entity tables

spec.md §3: the four name -> declaration mappings the tokenizer consults
when it encounters `&name;` or `%name;`. Owned by the
[`crate::parser::Tokenizer`] and outlives every input frame.

New relative to the teacher crate (which has no DTD or entity support at
all); the map shape and the "re-declaration is silently ignored" rule are
taken directly from spec.md §3's Invariants paragraph and from
`examples/original_source/src/Tokenizer.cpp`'s `declare_*` family, which
all check `m_*_entities.find(name) == end()` before inserting.
*/

use std::collections::HashMap;

/// An internal general entity: replacement text plus whether it was
/// declared in the external subset (relevant for standalone-integrity
/// checking, spec.md §4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct InternalGeneralEntity {
	pub replacement_text: String,
	pub from_external_subset: bool,
}

/// An external general entity: its identifiers, and an optional NDATA
/// notation name marking it as an *unparsed* entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalGeneralEntity {
	pub public_id: Option<String>,
	pub system_id: String,
	pub ndata: Option<String>,
}

/// An external parameter entity: its identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalParameterEntity {
	pub public_id: Option<String>,
	pub system_id: String,
}

fn predefined_entities() -> HashMap<String, InternalGeneralEntity> {
	let mut m = HashMap::with_capacity(5);
	for (name, repl) in [
		("lt", "&#60;"),
		("gt", "&#62;"),
		("amp", "&#38;"),
		("apos", "&#39;"),
		("quot", "&#34;"),
	] {
		m.insert(name.to_string(), InternalGeneralEntity {
			replacement_text: repl.to_string(),
			from_external_subset: false,
		});
	}
	m
}

/// The four entity tables, keyed by name. Constructed with the five
/// predefined general entities (`lt`, `gt`, `amp`, `apos`, `quot`) already
/// present.
#[derive(Debug, Clone)]
pub struct EntityTables {
	internal_general: HashMap<String, InternalGeneralEntity>,
	external_general: HashMap<String, ExternalGeneralEntity>,
	internal_parameter: HashMap<String, String>,
	external_parameter: HashMap<String, ExternalParameterEntity>,
}

impl Default for EntityTables {
	fn default() -> Self {
		Self::new()
	}
}

impl EntityTables {
	pub fn new() -> Self {
		Self {
			internal_general: predefined_entities(),
			external_general: HashMap::new(),
			internal_parameter: HashMap::new(),
			external_parameter: HashMap::new(),
		}
	}

	pub fn lookup_internal_general(&self, name: &str) -> Option<&InternalGeneralEntity> {
		self.internal_general.get(name)
	}

	pub fn lookup_external_general(&self, name: &str) -> Option<&ExternalGeneralEntity> {
		self.external_general.get(name)
	}

	pub fn lookup_internal_parameter(&self, name: &str) -> Option<&str> {
		self.internal_parameter.get(name).map(|s| s.as_str())
	}

	pub fn lookup_external_parameter(&self, name: &str) -> Option<&ExternalParameterEntity> {
		self.external_parameter.get(name)
	}

	/// Whether any general entity (internal or external) by this name is
	/// known. Used for `WFC: Entity Declared`.
	pub fn has_general(&self, name: &str) -> bool {
		self.internal_general.contains_key(name) || self.external_general.contains_key(name)
	}

	/// Whether `name` is a *general* entity that was declared externally
	/// (directly external, or an internal entity declared from within the
	/// external subset) -- used for `ExternalInStandalone`.
	pub fn is_externally_declared_general(&self, name: &str) -> bool {
		if self.external_general.contains_key(name) {
			return true;
		}
		matches!(self.internal_general.get(name), Some(e) if e.from_external_subset)
	}

	/// Declare an internal general entity. Re-declaration (a name already
	/// present in *either* general table) is silently ignored, per XML's
	/// first-declaration-wins rule.
	pub fn declare_internal_general(&mut self, name: String, replacement_text: String, from_external_subset: bool) {
		if self.internal_general.contains_key(&name) || self.external_general.contains_key(&name) {
			return;
		}
		self.internal_general.insert(name, InternalGeneralEntity { replacement_text, from_external_subset });
	}

	/// Declare an external general entity, optionally with an `NDATA`
	/// notation name marking it unparsed.
	pub fn declare_external_general(&mut self, name: String, public_id: Option<String>, system_id: String, ndata: Option<String>) {
		if self.internal_general.contains_key(&name) || self.external_general.contains_key(&name) {
			return;
		}
		self.external_general.insert(name, ExternalGeneralEntity { public_id, system_id, ndata });
	}

	pub fn declare_internal_parameter(&mut self, name: String, replacement_text: String) {
		if self.internal_parameter.contains_key(&name) || self.external_parameter.contains_key(&name) {
			return;
		}
		self.internal_parameter.insert(name, replacement_text);
	}

	pub fn declare_external_parameter(&mut self, name: String, public_id: Option<String>, system_id: String) {
		if self.internal_parameter.contains_key(&name) || self.external_parameter.contains_key(&name) {
			return;
		}
		self.external_parameter.insert(name, ExternalParameterEntity { public_id, system_id });
	}

	/// Whether `name` (general or parameter, as indicated by `is_parameter`)
	/// has *some* declaration, used for `WFC/VC: Entity Declared` in the DTD
	/// itself (a `%X;` reference to an undeclared parameter entity).
	pub fn has_parameter(&self, name: &str) -> bool {
		self.internal_parameter.contains_key(name) || self.external_parameter.contains_key(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn predefined_entities_are_preloaded() {
		let tables = EntityTables::new();
		assert_eq!(tables.lookup_internal_general("lt").unwrap().replacement_text, "&#60;");
		assert_eq!(tables.lookup_internal_general("amp").unwrap().replacement_text, "&#38;");
		assert!(tables.has_general("quot"));
	}

	#[test]
	fn redeclaration_is_silently_ignored() {
		let mut tables = EntityTables::new();
		tables.declare_internal_general("x".to_string(), "first".to_string(), false);
		tables.declare_internal_general("x".to_string(), "second".to_string(), false);
		assert_eq!(tables.lookup_internal_general("x").unwrap().replacement_text, "first");
	}

	#[test]
	fn declaring_predefined_entity_again_is_ignored() {
		let mut tables = EntityTables::new();
		tables.declare_internal_general("lt".to_string(), "something else".to_string(), false);
		assert_eq!(tables.lookup_internal_general("lt").unwrap().replacement_text, "&#60;");
	}

	#[test]
	fn external_standalone_tracking() {
		let mut tables = EntityTables::new();
		tables.declare_internal_general("a".to_string(), "x".to_string(), true);
		tables.declare_external_general("b".to_string(), None, "b.ent".to_string(), None);
		assert!(tables.is_externally_declared_general("a"));
		assert!(tables.is_externally_declared_general("b"));
		assert!(!tables.is_externally_declared_general("lt"));
	}
}
