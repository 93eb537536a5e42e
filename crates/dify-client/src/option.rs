//! Per-call overrides.

/// Per-call credential and extra headers.
///
/// Built with [`RequestOption::builder`] and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOption {
    api_key: Option<String>,
    headers: Vec<(String, String)>,
}

impl RequestOption {
    /// Create a new option builder.
    pub fn builder() -> RequestOptionBuilder {
        RequestOptionBuilder::default()
    }

    /// Shorthand for an option that only carries a credential.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    /// The API key, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Extra headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Layer `self` over `base`: the key falls back to `base`'s, headers of
    /// `self` come after (and so override) those of `base`.
    pub fn layered_over(&self, base: &RequestOption) -> RequestOption {
        RequestOption {
            api_key: self.api_key.clone().or_else(|| base.api_key.clone()),
            headers: base
                .headers
                .iter()
                .chain(&self.headers)
                .cloned()
                .collect(),
        }
    }
}

/// Builder for [`RequestOption`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptionBuilder {
    api_key: Option<String>,
    headers: Vec<(String, String)>,
}

impl RequestOptionBuilder {
    /// Set the API key sent as a bearer token.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Add an extra header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Build the option.
    pub fn build(self) -> RequestOption {
        RequestOption {
            api_key: self.api_key,
            headers: self.headers,
        }
    }
}
