mod ids;
mod question;
mod record;
mod result;
mod user;

pub use ids::{
    AnswerId, CategoryId, DifficultyId, ParseIdError, QuestionId, QuizId, SessionId, UserId,
};
pub use question::{Answer, Question, QuestionError};
pub use record::AnswerRecord;
pub use result::{QuestionOutcome, QuizResult};
pub use user::UserProfile;
