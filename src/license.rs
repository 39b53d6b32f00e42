//! SKU part number → human-readable license name.

// self
use crate::_prelude::*;

const BUILTIN: &[(&str, &str)] = &[
	("AAD_PREMIUM", "Microsoft Entra ID P1"),
	("AAD_PREMIUM_P2", "Microsoft Entra ID P2"),
	("ATP_ENTERPRISE", "Microsoft Defender for Office 365 (Plan 1)"),
	("DESKLESSPACK", "Office 365 F3"),
	("DEVELOPERPACK_E5", "Microsoft 365 E5 Developer"),
	("EMS", "Enterprise Mobility + Security E3"),
	("EMSPREMIUM", "Enterprise Mobility + Security E5"),
	("ENTERPRISEPACK", "Office 365 E3"),
	("ENTERPRISEPREMIUM", "Office 365 E5"),
	("ENTERPRISEPREMIUM_NOPSTNCONF", "Office 365 E5 (without Audio Conferencing)"),
	("EXCHANGEENTERPRISE", "Exchange Online (Plan 2)"),
	("EXCHANGESTANDARD", "Exchange Online (Plan 1)"),
	("FLOW_FREE", "Microsoft Power Automate Free"),
	("INTUNE_A", "Microsoft Intune Plan 1"),
	("M365_F1", "Microsoft 365 F1"),
	("MCOEV", "Microsoft Teams Phone Standard"),
	("MCOMEETADV", "Microsoft 365 Audio Conferencing"),
	("O365_BUSINESS", "Microsoft 365 Apps for Business"),
	("O365_BUSINESS_ESSENTIALS", "Microsoft 365 Business Basic"),
	("O365_BUSINESS_PREMIUM", "Microsoft 365 Business Standard"),
	("OFFICESUBSCRIPTION", "Microsoft 365 Apps for Enterprise"),
	("POWER_BI_PRO", "Power BI Pro"),
	("POWER_BI_STANDARD", "Power BI (free)"),
	("PROJECTPREMIUM", "Project Plan 5"),
	("PROJECTPROFESSIONAL", "Project Plan 3"),
	("SPB", "Microsoft 365 Business Premium"),
	("SPE_E3", "Microsoft 365 E3"),
	("SPE_E5", "Microsoft 365 E5"),
	("SPE_F1", "Microsoft 365 F3"),
	("STANDARDPACK", "Office 365 E1"),
	("STREAM", "Microsoft Stream"),
	("TEAMS_EXPLORATORY", "Microsoft Teams Exploratory"),
	("VISIOCLIENT", "Visio Plan 2"),
	("WIN10_VDA_E3", "Windows 10/11 Enterprise E3"),
];

/// Case-insensitive SKU name table with a humanized fallback.
#[derive(Clone, Debug)]
pub struct LicenseCatalog {
	names: BTreeMap<String, String>,
}
impl LicenseCatalog {
	/// Catalog seeded with the built-in table.
	pub fn builtin() -> Self {
		let names = BUILTIN
			.iter()
			.map(|(sku, name)| (sku.to_ascii_uppercase(), (*name).to_owned()))
			.collect();

		Self { names }
	}

	/// Adds or replaces an entry.
	pub fn with_entry(mut self, sku: &str, display_name: impl Into<String>) -> Self {
		self.names.insert(sku.trim().to_ascii_uppercase(), display_name.into());

		self
	}

	/// Display name for `sku`. Unknown SKUs are humanized; empty input yields `Unknown`.
	pub fn display_name(&self, sku: &str) -> String {
		let sku = sku.trim();

		match self.names.get(&sku.to_ascii_uppercase()) {
			Some(name) => name.clone(),
			None => humanize(sku),
		}
	}

	/// Display names for several SKUs, de-duplicated and joined with `, `.
	///
	/// Returns `None` when no SKU is given.
	pub fn display_names<'a, I>(&self, skus: I) -> Option<String>
	where
		I: IntoIterator<Item = &'a str>,
	{
		let mut seen = BTreeSet::new();
		let names = skus
			.into_iter()
			.map(|sku| self.display_name(sku))
			.filter(|name| seen.insert(name.clone()))
			.collect::<Vec<_>>();

		if names.is_empty() { None } else { Some(names.join(", ")) }
	}
}
impl Default for LicenseCatalog {
	fn default() -> Self {
		Self::builtin()
	}
}

fn humanize(sku: &str) -> String {
	let words = sku
		.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
		.filter(|word| !word.is_empty())
		.collect::<Vec<_>>();

	if words.is_empty() {
		return "Unknown".into();
	}

	let shouting = !sku.chars().any(char::is_lowercase);

	if !shouting {
		return words.join(" ");
	}

	words
		.iter()
		.map(|word| {
			let mut chars = word.chars();

			match chars.next() {
				Some(first) =>
					first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
				None => String::new(),
			}
		})
		.collect::<Vec<String>>()
		.join(" ")
}
