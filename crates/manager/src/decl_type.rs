use strum::{Display, EnumIter, IntoStaticStr};

/// Category a declaration belongs to.
///
/// Type keywords in declaration files are open-ended strings; they map onto a
/// `DeclType` only through the creator registered under that keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DeclType {
	/// Blocks whose type keyword is not (yet) known. Never claimed by a creator.
	Undetermined,
	Material,
	Table,
	EntityDef,
	SoundShader,
	ModelDef,
	Particle,
	Skin,
	Fx,
}

impl DeclType {
	pub fn as_str(self) -> &'static str {
		self.into()
	}
}
