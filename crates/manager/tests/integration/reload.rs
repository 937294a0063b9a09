use std::sync::Arc;

use decl_manager::DeclType;
use pretty_assertions::assert_eq;

use crate::common::{Fixture, material_names, write_file};

const TEMP_FILE: &str = "testdecls/temp_file.decl";

#[test]
fn reload_reconciles_a_changed_file() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;
	fixture.register_test_types();
	write_file(
		fixture.root(),
		TEMP_FILE,
		"decl/temporary/11 { diffusemap textures/temporary/11 }\n\ndecl/temporary/12 { diffusemap textures/temporary/12 }\n",
	);
	manager.register_decl_folder(DeclType::Material, "testdecls", "decl");

	assert!(manager.find_declaration(DeclType::Material, "decl/temporary/11").is_some());
	assert!(manager.find_declaration(DeclType::Material, "decl/temporary/13").is_none());
	let temporary12 = manager.find_declaration(DeclType::Material, "decl/temporary/12").expect("decl/temporary/12");
	assert_eq!(temporary12.block_syntax().contents.trim(), "diffusemap textures/temporary/12");

	write_file(
		fixture.root(),
		TEMP_FILE,
		"decl/temporary/12 { diffusemap textures/changed }\n\ndecl/temporary/13 { diffusemap textures/temporary/13 }\n",
	);
	manager.reload_declarations();

	assert!(manager.find_declaration(DeclType::Material, "decl/temporary/11").is_none());
	assert!(manager.find_declaration(DeclType::Material, "decl/temporary/13").is_some());
	let reloaded = manager.find_declaration(DeclType::Material, "decl/temporary/12").expect("decl/temporary/12 after reload");
	assert!(Arc::ptr_eq(&reloaded, &temporary12));
	assert_eq!(temporary12.block_syntax().contents.trim(), "diffusemap textures/changed");
}

#[test]
fn reload_drops_declarations_of_deleted_files() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;
	fixture.register_test_types();
	write_file(fixture.root(), TEMP_FILE, "decl/temporary/1 { }\ntestdecl2 temporary_table { { 0 } }\nunknown decl/unknown { }\n");
	manager.register_decl_folder(DeclType::Material, "testdecls", "decl");

	assert!(manager.find_declaration(DeclType::ModelDef, "temporary_table").is_some());
	assert_eq!(manager.unrecognized_block_count(), 1);
	let files = manager.parsed_file_count();

	std::fs::remove_file(fixture.root().join(TEMP_FILE)).expect("remove temp file");
	manager.reload_declarations();

	assert_eq!(manager.declaration_names(DeclType::Material), material_names());
	assert!(manager.find_declaration(DeclType::ModelDef, "temporary_table").is_none());
	assert_eq!(manager.unrecognized_block_count(), 0);
	assert_eq!(manager.parsed_file_count(), files - 1);
}

#[test]
fn reload_without_changes_keeps_every_instance() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;
	let (material, _) = fixture.register_test_types();
	manager.register_decl_folder(DeclType::Material, "testdecls", "decl");

	let before = manager.find_declaration(DeclType::Material, "decl/numbers/1").expect("decl/numbers/1");
	let created = material.created();

	manager.reload_declarations();
	manager.reload_declarations();

	let after = manager.find_declaration(DeclType::Material, "decl/numbers/1").expect("decl/numbers/1");
	assert!(Arc::ptr_eq(&before, &after));
	assert_eq!(material.created(), created);
	assert_eq!(manager.declaration_names(DeclType::Material), material_names());
}
