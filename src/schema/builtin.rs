//! Embedded RFC 7643 core schemas (User, Group) and the EnterpriseUser
//! extension referenced by spec §6.
//!
//! These are not a new feature surface: RFC 7643 defines them exhaustively,
//! and the rest of the engine needs concrete schema data to be exercised
//! and tested against.

use std::sync::Arc;

use super::attribute::{Attribute, AttributeBuilder};
use super::schema::{ResourceType, Schema};
use super::types::{AttributeType, Mutability, Returned, Uniqueness};

pub const USER_SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_SCHEMA_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const ENTERPRISE_USER_SCHEMA_URN: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

fn attr(name: &str, ty: AttributeType) -> AttributeBuilder {
    AttributeBuilder::new(name, ty)
}

fn meta_attribute() -> Arc<Attribute> {
    attr("meta", AttributeType::Complex)
        .mutability(Mutability::ReadOnly)
        .sub_attribute(
            attr("resourceType", AttributeType::String)
                .mutability(Mutability::ReadOnly)
                .build()
                .unwrap(),
        )
        .sub_attribute(
            attr("created", AttributeType::DateTime)
                .mutability(Mutability::ReadOnly)
                .build()
                .unwrap(),
        )
        .sub_attribute(
            attr("lastModified", AttributeType::DateTime)
                .mutability(Mutability::ReadOnly)
                .build()
                .unwrap(),
        )
        .sub_attribute(
            attr("location", AttributeType::Reference)
                .mutability(Mutability::ReadOnly)
                .build()
                .unwrap(),
        )
        .sub_attribute(
            attr("version", AttributeType::String)
                .mutability(Mutability::ReadOnly)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

fn name_attribute() -> Arc<Attribute> {
    attr("name", AttributeType::Complex)
        .sub_attribute(attr("formatted", AttributeType::String).build().unwrap())
        .sub_attribute(
            attr("familyName", AttributeType::String)
                .identity(true)
                .build()
                .unwrap(),
        )
        .sub_attribute(
            attr("givenName", AttributeType::String)
                .identity(true)
                .build()
                .unwrap(),
        )
        .sub_attribute(attr("middleName", AttributeType::String).build().unwrap())
        .sub_attribute(
            attr("honorificPrefix", AttributeType::String)
                .build()
                .unwrap(),
        )
        .sub_attribute(
            attr("honorificSuffix", AttributeType::String)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

fn multi_valued_complex(
    name: &str,
    canonical_values: &[&str],
    with_display: bool,
) -> Arc<Attribute> {
    let mut b = attr(name, AttributeType::Complex)
        .multi_valued(true)
        .sub_attribute(
            attr("value", AttributeType::String)
                .identity(true)
                .build()
                .unwrap(),
        );
    if with_display {
        b = b.sub_attribute(attr("display", AttributeType::String).build().unwrap());
    }
    if !canonical_values.is_empty() {
        b = b.sub_attribute(
            attr("type", AttributeType::String)
                .canonical_values(canonical_values.iter().copied())
                .build()
                .unwrap(),
        );
    } else {
        b = b.sub_attribute(attr("type", AttributeType::String).build().unwrap());
    }
    b = b.sub_attribute(
        attr("primary", AttributeType::Boolean)
            .primary(true)
            .build()
            .unwrap(),
    );
    b.build().unwrap()
}

/// The RFC 7643 §4.1 core User schema.
pub fn user_schema() -> Schema {
    Schema::builder(USER_SCHEMA_URN, "User")
        .description("User Account")
        .attribute(
            attr("id", AttributeType::String)
                .mutability(Mutability::ReadOnly)
                .uniqueness(Uniqueness::Server)
                .build()
                .unwrap(),
        )
        .attribute(
            attr("externalId", AttributeType::String)
                .build()
                .unwrap(),
        )
        .attribute(
            attr("userName", AttributeType::String)
                .required(true)
                .uniqueness(Uniqueness::Server)
                .build()
                .unwrap(),
        )
        .attribute(name_attribute())
        .attribute(
            attr("displayName", AttributeType::String)
                .build()
                .unwrap(),
        )
        .attribute(attr("nickName", AttributeType::String).build().unwrap())
        .attribute(
            attr("profileUrl", AttributeType::Reference)
                .reference_types(["external"])
                .build()
                .unwrap(),
        )
        .attribute(attr("title", AttributeType::String).build().unwrap())
        .attribute(attr("userType", AttributeType::String).build().unwrap())
        .attribute(
            attr("preferredLanguage", AttributeType::String)
                .build()
                .unwrap(),
        )
        .attribute(attr("locale", AttributeType::String).build().unwrap())
        .attribute(attr("timezone", AttributeType::String).build().unwrap())
        .attribute(attr("active", AttributeType::Boolean).build().unwrap())
        .attribute(
            attr("password", AttributeType::String)
                .mutability(Mutability::WriteOnly)
                .returned(Returned::Never)
                .build()
                .unwrap(),
        )
        .attribute(multi_valued_complex(
            "emails",
            &["work", "home", "other"],
            true,
        ))
        .attribute(multi_valued_complex(
            "phoneNumbers",
            &["work", "home", "mobile", "fax", "pager", "other"],
            true,
        ))
        .attribute(multi_valued_complex(
            "ims",
            &["aim", "gtalk", "icq", "xmpp", "msn", "skype", "qq", "yahoo"],
            true,
        ))
        .attribute(multi_valued_complex("photos", &["photo", "thumbnail"], true))
        .attribute(
            attr("addresses", AttributeType::Complex)
                .multi_valued(true)
                .sub_attribute(attr("formatted", AttributeType::String).build().unwrap())
                .sub_attribute(
                    attr("streetAddress", AttributeType::String)
                        .build()
                        .unwrap(),
                )
                .sub_attribute(attr("locality", AttributeType::String).build().unwrap())
                .sub_attribute(attr("region", AttributeType::String).build().unwrap())
                .sub_attribute(attr("postalCode", AttributeType::String).build().unwrap())
                .sub_attribute(attr("country", AttributeType::String).build().unwrap())
                .sub_attribute(
                    attr("type", AttributeType::String)
                        .canonical_values(["work", "home", "other"])
                        .build()
                        .unwrap(),
                )
                .sub_attribute(
                    attr("primary", AttributeType::Boolean)
                        .primary(true)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        )
        .attribute(
            attr("groups", AttributeType::Complex)
                .multi_valued(true)
                .mutability(Mutability::ReadOnly)
                .sub_attribute(attr("value", AttributeType::String).identity(true).build().unwrap())
                .sub_attribute(
                    attr("$ref", AttributeType::Reference)
                        .reference_types(["User", "Group"])
                        .build()
                        .unwrap(),
                )
                .sub_attribute(attr("display", AttributeType::String).build().unwrap())
                .sub_attribute(attr("type", AttributeType::String).build().unwrap())
                .build()
                .unwrap(),
        )
        .attribute(multi_valued_complex("entitlements", &[], true))
        .attribute(multi_valued_complex("roles", &[], true))
        .attribute(multi_valued_complex("x509Certificates", &[], true))
        .attribute(meta_attribute())
        .build()
        .unwrap()
}

/// The RFC 7643 §4.2 core Group schema.
pub fn group_schema() -> Schema {
    Schema::builder(GROUP_SCHEMA_URN, "Group")
        .description("Group")
        .attribute(
            attr("id", AttributeType::String)
                .mutability(Mutability::ReadOnly)
                .uniqueness(Uniqueness::Server)
                .build()
                .unwrap(),
        )
        .attribute(
            attr("displayName", AttributeType::String)
                .required(true)
                .build()
                .unwrap(),
        )
        .attribute(
            attr("members", AttributeType::Complex)
                .multi_valued(true)
                .sub_attribute(attr("value", AttributeType::String).identity(true).build().unwrap())
                .sub_attribute(
                    attr("$ref", AttributeType::Reference)
                        .reference_types(["User", "Group"])
                        .build()
                        .unwrap(),
                )
                .sub_attribute(attr("display", AttributeType::String).build().unwrap())
                .sub_attribute(attr("type", AttributeType::String).build().unwrap())
                .build()
                .unwrap(),
        )
        .attribute(meta_attribute())
        .build()
        .unwrap()
}

/// The RFC 7643 §4.3 Enterprise User extension.
pub fn enterprise_user_extension_schema() -> Schema {
    Schema::builder(ENTERPRISE_USER_SCHEMA_URN, "EnterpriseUser")
        .description("Enterprise User")
        .attribute(
            attr("employeeNumber", AttributeType::String)
                .build()
                .unwrap(),
        )
        .attribute(attr("costCenter", AttributeType::String).build().unwrap())
        .attribute(attr("organization", AttributeType::String).build().unwrap())
        .attribute(attr("division", AttributeType::String).build().unwrap())
        .attribute(attr("department", AttributeType::String).build().unwrap())
        .attribute(
            attr("manager", AttributeType::Complex)
                .sub_attribute(attr("value", AttributeType::String).identity(true).build().unwrap())
                .sub_attribute(
                    attr("$ref", AttributeType::Reference)
                        .reference_types(["User"])
                        .build()
                        .unwrap(),
                )
                .sub_attribute(attr("displayName", AttributeType::String).build().unwrap())
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

/// The User resource type with its EnterpriseUser extension registered.
pub fn user_resource_type() -> ResourceType {
    ResourceType::new("User", "/Users", Arc::new(user_schema()))
        .with_extension(Arc::new(enterprise_user_extension_schema()))
}

/// The Group resource type.
pub fn group_resource_type() -> ResourceType {
    ResourceType::new("Group", "/Groups", Arc::new(group_schema()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_schema_has_core_attributes() {
        let schema = user_schema();
        assert!(schema.attribute("userName").is_some());
        assert!(schema.attribute("emails").is_some());
        assert!(schema.attribute("meta").is_some());
    }

    #[test]
    fn emails_element_has_primary_guard() {
        let schema = user_schema();
        let emails = schema.attribute("emails").unwrap();
        assert!(emails.sub_attribute("primary").unwrap().primary);
    }

    #[test]
    fn password_is_write_only_never_returned() {
        let schema = user_schema();
        let password = schema.attribute("password").unwrap();
        assert_eq!(password.mutability, Mutability::WriteOnly);
        assert_eq!(password.returned, Returned::Never);
    }
}
