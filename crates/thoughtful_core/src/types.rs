pub type UserId = String;
pub type InstructorId = String;
pub type RefreshTokenId = String;

pub type UnitId = String;
pub type LessonId = String;
pub type SectionId = String;
pub type IsoTimestamp = String;
