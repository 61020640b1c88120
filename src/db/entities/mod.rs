pub mod branch;
pub mod checkin;
pub mod member;
pub mod membership;
pub mod membership_freeze;
pub mod membership_type;
pub mod offer;

pub mod prelude {
    pub use super::branch::{self, Entity as Branch};
    pub use super::checkin::{self, Entity as Checkin};
    pub use super::member::{self, Entity as Member};
    pub use super::membership::{self, Entity as Membership};
    pub use super::membership_freeze::{self, Entity as MembershipFreeze};
    pub use super::membership_type::{self, Entity as MembershipType};
    pub use super::offer::{self, Entity as Offer};
}
