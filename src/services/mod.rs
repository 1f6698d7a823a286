pub mod completion;
pub mod feedback;

pub use completion::{CompletionService, Fragment, FragmentStream, OpenAiCompletion, UpstreamError};
pub use feedback::{
    FeedbackError, FeedbackRecord, FeedbackSink, JsonlFeedbackSink, LogFeedbackSink, RatingRecord,
};
