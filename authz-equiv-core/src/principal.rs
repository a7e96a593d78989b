/*
 * Copyright Cedar Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Identity attributes of the caller, used to resolve `principal.<attr>`
//! references in residuals.

use crate::ir::Expr;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;

/// Separator between `sub` and `username` in the composite identity key
pub const COMPOSITE_KEY_SEPARATOR: &str = "::";

/// The identity attributes owner rules match against.
///
/// All three are supplied by the caller. [`Principal::from_sub_and_username`]
/// is available for callers that follow the usual `sub::username` convention
/// for the composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Principal {
    sub: SmolStr,
    username: SmolStr,
    sub_username: SmolStr,
}

impl Principal {
    /// Construct a principal from all three attributes
    pub fn new(
        sub: impl Into<SmolStr>,
        username: impl Into<SmolStr>,
        sub_username: impl Into<SmolStr>,
    ) -> Self {
        Self {
            sub: sub.into(),
            username: username.into(),
            sub_username: sub_username.into(),
        }
    }

    /// Construct a principal whose composite key is `sub::username`
    pub fn from_sub_and_username(sub: impl Into<SmolStr>, username: impl Into<SmolStr>) -> Self {
        let sub = sub.into();
        let username = username.into();
        let sub_username = format!("{sub}{COMPOSITE_KEY_SEPARATOR}{username}").into();
        Self {
            sub,
            username,
            sub_username,
        }
    }

    /// Subject id
    pub fn sub(&self) -> &str {
        &self.sub
    }

    /// Username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Composite `sub::username` key
    pub fn sub_username(&self) -> &str {
        &self.sub_username
    }

    /// Value of one identity attribute
    pub fn get(&self, attr: PrincipalAttr) -> &str {
        match attr {
            PrincipalAttr::Sub => self.sub(),
            PrincipalAttr::Username => self.username(),
            PrincipalAttr::SubUsername => self.sub_username(),
        }
    }

    /// Resolve `principal.<attr_name>` to a literal.
    ///
    /// Fails if `attr_name` is not one of the identity attributes.
    pub fn resolve(&self, attr_name: &str) -> Result<Expr, UnknownPrincipalAttributeError> {
        let attr = attr_name.parse::<PrincipalAttr>()?;
        Ok(Expr::lit(self.get(attr)))
    }
}

/// Names of the identity attributes a principal carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalAttr {
    /// `sub`
    Sub,
    /// `username`
    Username,
    /// `subUsername`
    SubUsername,
}

impl PrincipalAttr {
    /// All attributes, in declaration order
    pub const ALL: [PrincipalAttr; 3] = [
        PrincipalAttr::Sub,
        PrincipalAttr::Username,
        PrincipalAttr::SubUsername,
    ];

    /// Attribute name as used in residuals
    pub fn as_str(self) -> &'static str {
        match self {
            PrincipalAttr::Sub => "sub",
            PrincipalAttr::Username => "username",
            PrincipalAttr::SubUsername => "subUsername",
        }
    }
}

impl Display for PrincipalAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalAttr {
    type Err = UnknownPrincipalAttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrincipalAttr::ALL
            .into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| UnknownPrincipalAttributeError { attr: s.into() })
    }
}

/// A residual referenced a principal attribute that is not an identity
/// attribute
#[derive(Debug, Clone, PartialEq, Eq, Diagnostic, Error)]
#[error("cannot resolve `principal.{attr}`: not an identity attribute")]
#[diagnostic(
    code(authz_equiv::principal::unknown_attribute),
    help("identity attributes are `sub`, `username` and `subUsername`")
)]
pub struct UnknownPrincipalAttributeError {
    /// The attribute that was requested
    pub attr: SmolStr,
}
