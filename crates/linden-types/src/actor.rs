//! Actors and roles
//!
//! Role names follow the university's organizational vocabulary and are
//! stable wire identifiers shared with the frontend.

use crate::ids::{FacultyId, UserId};
use serde::{Deserialize, Serialize};

/// Role of a user within the proposal workflow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Lecturer / principal investigator — owns proposals
    GiangVien,
    /// Faculty manager — reviews proposals of their own faculty
    QuanLyKhoa,
    /// Council secretary — coordinates council evaluations
    ThuKyHoiDong,
    /// Research office — operates selection, pause/resume, acceptance
    PhongKhcn,
    /// University board — final approval and rejection authority
    BanGiamHoc,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GiangVien => "GIANG_VIEN",
            Self::QuanLyKhoa => "QUAN_LY_KHOA",
            Self::ThuKyHoiDong => "THU_KY_HOI_DONG",
            Self::PhongKhcn => "PHONG_KHCN",
            Self::BanGiamHoc => "BAN_GIAM_HOC",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GIANG_VIEN" => Ok(Self::GiangVien),
            "QUAN_LY_KHOA" => Ok(Self::QuanLyKhoa),
            "THU_KY_HOI_DONG" => Ok(Self::ThuKyHoiDong),
            "PHONG_KHCN" => Ok(Self::PhongKhcn),
            "BAN_GIAM_HOC" => Ok(Self::BanGiamHoc),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated caller of a workflow action.
///
/// Authentication happens upstream; by the time a request reaches the
/// engine the actor is already resolved. Authorization is re-checked
/// here regardless of what the UI showed the user.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: UserId,
    pub display_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty_id: Option<FacultyId>,
}

impl Actor {
    pub fn new(id: UserId, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            faculty_id: None,
        }
    }

    pub fn with_faculty(mut self, faculty_id: FacultyId) -> Self {
        self.faculty_id = Some(faculty_id);
        self
    }
}
