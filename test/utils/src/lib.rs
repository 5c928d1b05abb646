pub fn chat_completion_fixture() -> &'static str {
    return r#"
{
  "id": "chatcmpl-8FxkWfnTQxdIyq4LbF0jC7vYUKwsz",
  "object": "chat.completion",
  "created": 1698844136,
  "model": "gpt-3.5-turbo-0613",
  "choices": [
    {
      "index": 0,
      "message": {
        "role": "assistant",
        "content": "Hello! How can I help you today?"
      },
      "finish_reason": "stop"
    }
  ],
  "usage": {
    "prompt_tokens": 9,
    "completion_tokens": 9,
    "total_tokens": 18
  }
}
"#
    .trim();
}

pub fn image_generation_fixture() -> &'static str {
    return r#"
{
  "created": 1698844136,
  "data": [
    {
      "url": "https://images.example.com/first.png"
    },
    {
      "b64_json": "aGVsbG8="
    },
    {
      "url": "https://images.example.com/second.png"
    }
  ]
}
"#
    .trim();
}

pub fn invalid_api_key_fixture() -> &'static str {
    return r#"
{
  "error": {
    "message": "Incorrect API key provided: sk-abc. You can find your API key at https://platform.openai.com/account/api-keys.",
    "type": "invalid_request_error",
    "param": null,
    "code": "invalid_api_key"
  }
}
"#
    .trim();
}

pub fn rate_limit_fixture() -> &'static str {
    return r#"
{
  "error": {
    "message": "Rate limit reached for requests",
    "type": "requests",
    "param": null,
    "code": "rate_limit_exceeded"
  }
}
"#
    .trim();
}
