pub mod envelope;
pub mod sealer;
