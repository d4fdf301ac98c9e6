//! HTML form discovery and submission payloads.

use std::sync::LazyLock;

use regex_lite::Regex;
use url::Url;

use super::markup::decode_html_entities;

static FORM_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form>").expect("FORM_RE should compile"));
static INPUT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<input\b([^>]*)>").expect("INPUT_RE should compile"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*(?:=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>=`]+)))?"#)
		.expect("ATTR_RE should compile")
});

const CODE_INPUT_NAMES: &[&str] = &["code", "otp", "token"];

/// One `<input>` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Input {
	pub name: Option<String>,
	pub kind: String,
	pub value: String,
	pub placeholder: Option<String>,
	pub maxlength: Option<String>,
	pub checked: bool,
}

impl Input {
	fn parse(attrs: &str) -> Self {
		let mut input = Input {
			kind: "text".into(),
			..Default::default()
		};
		for (key, value) in attributes(attrs) {
			match key.as_str() {
				"name" => input.name = Some(value),
				"type" => input.kind = value.to_ascii_lowercase(),
				"value" => input.value = value,
				"placeholder" => input.placeholder = Some(value),
				"maxlength" => input.maxlength = Some(value),
				"checked" => input.checked = true,
				_ => {}
			}
		}
		input
	}

	fn is_textual(&self) -> bool {
		matches!(self.kind.as_str(), "text" | "number" | "tel" | "")
	}

	/// Inputs that take a one-time code.
	pub(crate) fn is_code_input(&self) -> bool {
		if self.kind == "hidden" {
			return false;
		}
		let named = self
			.name
			.as_deref()
			.is_some_and(|n| CODE_INPUT_NAMES.iter().any(|c| n.eq_ignore_ascii_case(c)));
		let placeholder = self
			.placeholder
			.as_deref()
			.is_some_and(|p| p.to_ascii_lowercase().contains("code"));
		let six_digits = self.is_textual() && self.maxlength.as_deref().map(str::trim) == Some("6");
		named || placeholder || six_digits
	}

	fn is_identity(&self) -> bool {
		if self.kind == "email" {
			return true;
		}
		self.is_textual()
			&& self.name.as_deref().is_some_and(|n| {
				let n = n.to_ascii_lowercase();
				n.contains("email") || n.contains("user") || n.contains("login")
			})
	}
}

/// One `<form>` element with its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Form {
	pub action: Option<String>,
	pub method: String,
	pub inputs: Vec<Input>,
}

impl Form {
	pub(crate) fn has_password(&self) -> bool {
		self.inputs.iter().any(|i| i.kind == "password")
	}

	/// Absolute submission URL; a missing action posts back to the page.
	pub(crate) fn target(&self, page: &Url) -> Result<Url, url::ParseError> {
		match self.action.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
			Some(action) => page.join(action),
			None => Ok(page.clone()),
		}
	}

	pub(crate) fn is_get(&self) -> bool {
		self.method.eq_ignore_ascii_case("get")
	}

	/// Payload with the identity and password fields filled in.
	///
	/// Returns `None` when no identity field can be found.
	pub(crate) fn login_fields(&self, email: &str, password: &str) -> Option<Vec<(String, String)>> {
		let identity = self
			.inputs
			.iter()
			.position(Input::is_identity)
			.or_else(|| self.inputs.iter().position(|i| i.is_textual() && i.name.is_some()))?;

		Some(self.fill(|index, input| {
			if index == identity {
				Some(email.to_string())
			} else if input.kind == "password" {
				Some(password.to_string())
			} else {
				None
			}
		}))
	}

	/// Payload with every code field set to `code`.
	pub(crate) fn code_fields(&self, code: &str) -> Vec<(String, String)> {
		self.fill(|_, input| input.is_code_input().then(|| code.to_string()))
	}

	/// Named, non-button inputs with their current values unless `with` overrides them.
	fn fill(&self, with: impl Fn(usize, &Input) -> Option<String>) -> Vec<(String, String)> {
		self.inputs
			.iter()
			.enumerate()
			.filter(|(_, input)| !matches!(input.kind.as_str(), "submit" | "button" | "image" | "reset" | "file"))
			.filter(|(_, input)| !matches!(input.kind.as_str(), "checkbox" | "radio") || input.checked)
			.filter_map(|(index, input)| {
				let name = input.name.clone()?;
				let value = with(index, input).unwrap_or_else(|| input.value.clone());
				Some((name, value))
			})
			.collect()
	}
}

/// Every form on the page.
pub(crate) fn parse_forms(html: &str) -> Vec<Form> {
	FORM_RE
		.captures_iter(html)
		.map(|caps| {
			let attrs = caps.get(1).map_or("", |m| m.as_str());
			let body = caps.get(2).map_or("", |m| m.as_str());
			let mut action = None;
			let mut method = "get".to_string();
			for (key, value) in attributes(attrs) {
				match key.as_str() {
					"action" => action = Some(value),
					"method" => method = value,
					_ => {}
				}
			}
			Form {
				action,
				method,
				inputs: INPUT_RE
					.captures_iter(body)
					.map(|c| Input::parse(c.get(1).map_or("", |m| m.as_str())))
					.collect(),
			}
		})
		.collect()
}

/// Inputs anywhere on the page, including ones outside a `<form>`.
pub(crate) fn loose_inputs(html: &str) -> Vec<Input> {
	INPUT_RE
		.captures_iter(html)
		.map(|c| Input::parse(c.get(1).map_or("", |m| m.as_str())))
		.collect()
}

fn attributes(attrs: &str) -> Vec<(String, String)> {
	ATTR_RE
		.captures_iter(attrs)
		.filter_map(|caps| {
			let key = caps.get(1)?.as_str().to_ascii_lowercase();
			let value = caps
				.get(2)
				.or_else(|| caps.get(3))
				.or_else(|| caps.get(4))
				.map_or(String::new(), |m| decode_html_entities(m.as_str()));
			Some((key, value))
		})
		.collect()
}
