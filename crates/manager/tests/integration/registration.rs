use std::sync::Arc;

use decl_manager::{BaseDeclarationCreator, DeclError, DeclType, DeclarationCreator};
use pretty_assertions::assert_eq;

use crate::common::{Fixture, TESTDECL, TESTDECL2, TestDeclarationCreator, material_names, table_names};

#[test]
fn type_names_register_once() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;

	manager.register_decl_type(TESTDECL, TestDeclarationCreator::new(DeclType::Material)).expect("first registration");
	let duplicate = manager.register_decl_type(TESTDECL, TestDeclarationCreator::new(DeclType::Material));
	assert!(matches!(duplicate, Err(DeclError::DuplicateType(name)) if name == TESTDECL));

	manager.unregister_decl_type(TESTDECL).expect("unregister");
	manager.register_decl_type(TESTDECL, TestDeclarationCreator::new(DeclType::Material)).expect("registration after unregister");

	manager.unregister_decl_type(TESTDECL).expect("unregister");
	let missing = manager.unregister_decl_type(TESTDECL);
	assert!(matches!(missing, Err(DeclError::UnknownType(name)) if name == TESTDECL));
}

#[test]
fn unregistering_keeps_existing_declarations() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;
	fixture.register_test_types();
	manager.register_decl_folder(DeclType::Material, "testdecls", "decl");
	assert_eq!(manager.declaration_names(DeclType::ModelDef), table_names());

	manager.unregister_decl_type(TESTDECL2).expect("unregister");
	assert_eq!(manager.declaration_names(DeclType::ModelDef), table_names());

	// Without a creator the typed blocks stay buffered on reload.
	manager.reload_declarations();
	assert_eq!(manager.declaration_names(DeclType::Material), material_names());
	assert_eq!(manager.unrecognized_block_count(), 3);
}

#[test]
fn second_creator_of_a_type_takes_over() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;
	let first = TestDeclarationCreator::new(DeclType::Material);
	let second = TestDeclarationCreator::new(DeclType::Material);
	manager.register_decl_type(TESTDECL, Arc::clone(&first) as Arc<dyn DeclarationCreator>).expect("register");
	manager.register_decl_type("material", Arc::clone(&second) as Arc<dyn DeclarationCreator>).expect("register");

	manager.register_decl_folder(DeclType::Material, "testdecls", "decl");
	assert_eq!(manager.declaration_count(DeclType::Material), material_names().len());
	assert_eq!(first.created(), material_names().len());
	assert_eq!(second.created(), 0);

	manager.unregister_decl_type(TESTDECL).expect("unregister");
	crate::common::write_file(fixture.root(), "testdecls/extra.decl", "decl/extra { }\n");
	manager.reload_declarations();
	assert!(manager.find_declaration(DeclType::Material, "decl/extra").is_some());
	assert_eq!(second.created(), 1);
}

#[test]
fn base_creator_serves_plain_declarations() {
	let fixture = Fixture::new();
	let manager = &fixture.manager;
	manager.register_decl_type("model", Arc::new(BaseDeclarationCreator::new(DeclType::ModelDef))).expect("register");
	manager.register_decl_folder(DeclType::ModelDef, "testmodels/", ".def");

	let model = manager.find_declaration(DeclType::ModelDef, "models/box").expect("models/box");
	assert_eq!(model.decl_type(), DeclType::ModelDef);
	assert_eq!(model.block_syntax().contents.trim(), "mesh models/box.lwo");
	assert_eq!(model.block_syntax().file_name, "testmodels/models.def");
	assert!(model.block_syntax().type_name.is_empty());
}
