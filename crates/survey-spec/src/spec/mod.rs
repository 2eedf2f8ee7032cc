pub mod logic;
pub mod question;
pub mod survey;

pub use logic::{Action, LogicRule, Operator, RuleId};
pub use question::{Choice, ChoiceId, Constraint, Question, QuestionType};
pub use survey::{LocalizedText, Section, SectionId, Survey, SurveyId};
