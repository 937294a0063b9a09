use std::collections::HashMap;
use std::sync::Arc;

use crate::{DeclType, DeclarationBlockSyntax, DeclarationCreator};

/// Registered creators by type name and by resolved type.
#[derive(Clone, Default)]
pub(super) struct CreatorTable {
	by_name: HashMap<String, Arc<dyn DeclarationCreator>>,
	by_type: HashMap<DeclType, Arc<dyn DeclarationCreator>>,
}

impl CreatorTable {
	pub fn contains_name(&self, name: &str) -> bool {
		self.by_name.contains_key(name)
	}

	/// Adds a creator. The first creator registered for a type stays active
	/// for it.
	pub fn insert(&mut self, name: &str, creator: Arc<dyn DeclarationCreator>) {
		self.by_type.entry(creator.decl_type()).or_insert_with(|| Arc::clone(&creator));
		self.by_name.insert(name.to_owned(), creator);
	}

	/// Removes the creator registered under `name`. If it was active for its
	/// type, another creator of the same type takes over.
	pub fn remove(&mut self, name: &str) -> Option<Arc<dyn DeclarationCreator>> {
		let creator = self.by_name.remove(name)?;
		let decl_type = creator.decl_type();

		if self.by_type.get(&decl_type).is_some_and(|active| Arc::ptr_eq(active, &creator)) {
			self.by_type.remove(&decl_type);
			if let Some(next) = self.by_name.values().find(|other| other.decl_type() == decl_type) {
				self.by_type.insert(decl_type, Arc::clone(next));
			}
		}

		Some(creator)
	}

	pub fn type_for_name(&self, name: &str) -> Option<DeclType> {
		self.by_name.get(name).map(|creator| creator.decl_type())
	}

	/// Type keyword to type map handed to folder jobs.
	pub fn type_names(&self) -> HashMap<String, DeclType> {
		self.by_name.iter().map(|(name, creator)| (name.clone(), creator.decl_type())).collect()
	}

	/// Creator responsible for a block found under `bucket`. Undetermined
	/// blocks are looked up again by their type keyword.
	pub fn resolve(&self, bucket: DeclType, block: &DeclarationBlockSyntax) -> Option<Arc<dyn DeclarationCreator>> {
		let decl_type = match bucket {
			DeclType::Undetermined => self.type_for_name(&block.type_name)?,
			decl_type => decl_type,
		};
		self.by_type.get(&decl_type).cloned()
	}

	pub fn clear(&mut self) {
		self.by_name.clear();
		self.by_type.clear();
	}
}
