use axum::response::Html;

/// The whole interface is one static page; everything dynamic arrives over
/// the JSON routes and the session event stream.
pub(crate) fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

const CHAT_PAGE: &str = r##"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Scout: chat with search</title>
<style>
  * { box-sizing: border-box; }
  body {
    margin: 0;
    font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
    background: #f4f5f7;
    color: #1c1e21;
    display: flex;
    height: 100vh;
  }
  aside {
    width: 260px;
    padding: 1.25rem;
    background: #fff;
    border-right: 1px solid #e3e5e8;
  }
  aside h2 { margin: 0 0 1rem; font-size: 1rem; }
  aside label { font-size: 0.8rem; color: #555; display: block; margin-bottom: 0.3rem; }
  aside input {
    width: 100%;
    padding: 0.5rem;
    border: 1px solid #ccd0d5;
    border-radius: 6px;
  }
  main {
    flex: 1;
    display: flex;
    flex-direction: column;
    max-width: 860px;
    margin: 0 auto;
    padding: 0 1rem;
  }
  h1 { font-size: 1.3rem; margin: 1rem 0; }
  #messages { flex: 1; overflow-y: auto; padding-bottom: 1rem; }
  .msg { margin: 0.6rem 0; display: flex; }
  .msg.user { justify-content: flex-end; }
  .bubble {
    max-width: 80%;
    padding: 0.6rem 0.9rem;
    border-radius: 12px;
    background: #fff;
    border: 1px solid #e3e5e8;
    white-space: pre-wrap;
    word-break: break-word;
  }
  .msg.user .bubble { background: #0b57d0; color: #fff; border: none; }
  .msg.error .bubble { background: #fdecea; border-color: #f5c6cb; color: #842029; }
  details.steps {
    margin-bottom: 0.4rem;
    font-size: 0.8rem;
    color: #555;
  }
  details.steps summary { cursor: pointer; }
  details.steps div { white-space: pre-wrap; word-break: break-word; margin: 0.2rem 0; }
  details.steps .step-error { color: #b3261e; }
  form {
    display: flex;
    gap: 0.5rem;
    padding: 0.75rem 0 1rem;
    border-top: 1px solid #e3e5e8;
  }
  form input {
    flex: 1;
    padding: 0.6rem 0.8rem;
    border: 1px solid #ccd0d5;
    border-radius: 8px;
    font-size: 1rem;
  }
  form button {
    padding: 0.6rem 1.1rem;
    border: none;
    border-radius: 8px;
    background: #0b57d0;
    color: #fff;
    font-size: 1rem;
    cursor: pointer;
  }
  form button:disabled, form input:disabled { opacity: 0.5; }
</style>
</head>
<body>
<aside>
  <h2>Settings</h2>
  <label for="api-key">Groq API key</label>
  <input id="api-key" type="password" autocomplete="off" placeholder="gsk_...">
</aside>
<main>
  <h1>&#128270; Chat with search</h1>
  <div id="messages"></div>
  <form id="composer">
    <input id="prompt" autocomplete="off" placeholder="Ask anything..." disabled>
    <button id="send" type="submit" disabled>Send</button>
  </form>
</main>
<script>
  const messagesEl = document.getElementById('messages');
  const promptEl = document.getElementById('prompt');
  const sendEl = document.getElementById('send');
  const apiKeyEl = document.getElementById('api-key');
  const composerEl = document.getElementById('composer');

  let sessionId = null;
  let pending = null;

  function addBubble(role, content) {
    const msg = document.createElement('div');
    msg.className = 'msg ' + role;
    const bubble = document.createElement('div');
    bubble.className = 'bubble';
    bubble.textContent = content;
    msg.appendChild(bubble);
    messagesEl.appendChild(msg);
    messagesEl.scrollTop = messagesEl.scrollHeight;
    return bubble;
  }

  function beginTurn() {
    const msg = document.createElement('div');
    msg.className = 'msg assistant';
    const bubble = document.createElement('div');
    bubble.className = 'bubble';

    const steps = document.createElement('details');
    steps.className = 'steps';
    const summary = document.createElement('summary');
    summary.textContent = 'Thinking';
    steps.appendChild(summary);

    const answer = document.createElement('div');
    bubble.appendChild(steps);
    bubble.appendChild(answer);
    msg.appendChild(bubble);
    messagesEl.appendChild(msg);
    messagesEl.scrollTop = messagesEl.scrollHeight;

    pending = { steps, answer };
    setBusy(true);
  }

  function addStep(text, isError) {
    if (!pending) return;
    const step = document.createElement('div');
    if (isError) step.className = 'step-error';
    step.textContent = text;
    pending.steps.appendChild(step);
    messagesEl.scrollTop = messagesEl.scrollHeight;
  }

  function endTurn() {
    pending = null;
    setBusy(false);
    promptEl.focus();
  }

  function setBusy(busy) {
    promptEl.disabled = busy;
    sendEl.disabled = busy;
  }

  function handleEvent(event) {
    switch (event.type) {
      case 'token':
        if (pending) {
          pending.answer.textContent += event.text;
          messagesEl.scrollTop = messagesEl.scrollHeight;
        }
        break;
      case 'tool_call':
        addStep('tool: ' + event.name + '(' + JSON.stringify(event.input) + ')', false);
        break;
      case 'tool_result':
        addStep((event.is_error ? 'error: ' : 'result: ') + event.content, event.is_error);
        break;
      case 'assistant':
        if (pending) pending.answer.textContent = event.text;
        endTurn();
        break;
      case 'error':
        addBubble('error', 'Error: ' + event.message);
        endTurn();
        break;
      case 'done':
        if (pending) endTurn();
        break;
    }
  }

  async function init() {
    const created = await fetch('/sessions', { method: 'POST' });
    sessionId = (await created.json()).session_id;

    const transcript = await (await fetch('/sessions/' + sessionId)).json();
    for (const msg of transcript.messages) {
      addBubble(msg.role, msg.content);
    }

    const source = new EventSource('/sessions/' + sessionId + '/stream');
    source.onmessage = (e) => handleEvent(JSON.parse(e.data));

    setBusy(false);
    promptEl.focus();
  }

  composerEl.addEventListener('submit', async (e) => {
    e.preventDefault();
    const content = promptEl.value.trim();
    if (!content || !sessionId) return;

    promptEl.value = '';
    addBubble('user', content);
    beginTurn();

    const res = await fetch('/sessions/' + sessionId + '/messages', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ content: content, api_key: apiKeyEl.value }),
    });
    if (!res.ok) {
      addBubble('error', 'Request failed: ' + res.status);
      endTurn();
    }
  });

  init();
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::CHAT_PAGE;

    #[test]
    fn page_wires_the_session_protocol() {
        assert!(CHAT_PAGE.contains("/sessions"));
        assert!(CHAT_PAGE.contains("/stream"));
        assert!(CHAT_PAGE.contains("api_key"));
        assert!(CHAT_PAGE.contains("type=\"password\""));
    }
}
